//! Test-only builders for agents, regions, and scenario files.

use std::fs;
use std::path::PathBuf;

use crate::agents::PiecewiseConstant;
use crate::core::types::{Interval, Region};
use crate::core::valuation::Valuation;

/// Piecewise-constant agent with one density per unit segment.
pub fn piecewise(name: &str, values: &[f64]) -> Box<dyn Valuation> {
    Box::new(PiecewiseConstant::new(name, values.to_vec()).expect("valid agent"))
}

/// Agent valuing every one of `segments` unit segments at 1.
pub fn uniform(segments: usize) -> Box<dyn Valuation> {
    piecewise("uniform", &vec![1.0; segments])
}

/// One agent per row, named `agent-1`, `agent-2`, ...
pub fn agents(rows: &[&[f64]]) -> Vec<Box<dyn Valuation>> {
    rows.iter()
        .enumerate()
        .map(|(index, values)| piecewise(&format!("agent-{}", index + 1), values))
        .collect()
}

/// Canonical region from `(start, end)` pairs.
pub fn region(pairs: &[(f64, f64)]) -> Region {
    Region::from_intervals(
        pairs
            .iter()
            .map(|(start, end)| Interval::new(*start, *end))
            .collect(),
    )
}

/// Write a scenario file into a fresh temp directory.
///
/// Keep the returned `TempDir` alive while the path is in use.
pub fn scenario_file(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("scenario.toml");
    fs::write(&path, contents).expect("write scenario");
    (temp, path)
}

/// Scenario TOML for the given density rows.
pub fn scenario_toml(rows: &[&[f64]]) -> String {
    let mut out = String::new();
    for (index, values) in rows.iter().enumerate() {
        let values: Vec<String> = values.iter().map(|value| format!("{:?}", value)).collect();
        out.push_str(&format!(
            "[[agents]]\nname = \"agent-{}\"\nvalues = [{}]\n\n",
            index + 1,
            values.join(", ")
        ));
    }
    out
}
