//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::case::{CaseFile, discover_cases};
use crate::report::aggregate;
use crate::run::run_case;

/// List all available cases.
pub fn list_cases(repo_root: &Path) -> Result<()> {
    let cases_dir = repo_root.join("eval").join("cases");
    let cases = discover_cases(&cases_dir)?;
    for case in cases {
        println!("{}  {}", case.case.id, case.case.description);
    }
    Ok(())
}

/// Run a case by id (optionally multiple times) and print a summary.
pub fn run_case_by_id(repo_root: &Path, case_id: &str, runs: u32, json: bool) -> Result<()> {
    let cases_dir = repo_root.join("eval").join("cases");
    let case_path = cases_dir.join(format!("{case_id}.toml"));
    if !case_path.exists() {
        bail!("case {} not found at {}", case_id, case_path.display());
    }
    let case = CaseFile::load(&case_path).context("load case")?;
    debug!(case_id, runs, "case loaded");

    info!(case_id, runs, "starting runs");
    let mut outcomes = Vec::new();
    for run in 0..runs {
        let outcome = run_case(&case, run).context("run case")?;
        if !json {
            println!(
                "run: case={} run={} outcome={:?} rounds={}",
                case_id,
                run,
                outcome.outcome,
                outcome
                    .rounds
                    .map_or_else(|| "-".to_string(), |rounds| rounds.to_string())
            );
        }
        outcomes.push(outcome);
    }

    let summary = aggregate(&outcomes);
    if json {
        let payload = serde_json::json!({ "case": case_id, "runs": outcomes, "summary": summary });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("serialize summary json")?
        );
        return Ok(());
    }
    println!(
        "report: case={} runs={} envy_free={} envious={} failed={}",
        case_id, summary.runs, summary.envy_free, summary.envious, summary.failed
    );
    if let Some(avg) = summary.avg_rounds {
        println!("report: avg_rounds={:.2}", avg);
    }
    for (kind, count) in &summary.failures {
        println!("report: failure {} {}", kind, count);
    }
    Ok(())
}
