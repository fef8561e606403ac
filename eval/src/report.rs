//! Aggregation of run outcomes for one case.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::outcome::Outcome;
use crate::run::RunOutcome;

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct ReportSummary {
    pub runs: usize,
    pub envy_free: usize,
    pub envious: usize,
    pub failed: usize,
    /// Failures keyed by error kind.
    pub failures: BTreeMap<String, usize>,
    /// Mean CORE rounds over successful runs.
    pub avg_rounds: Option<f64>,
}

pub fn aggregate(outcomes: &[RunOutcome]) -> ReportSummary {
    let mut summary = ReportSummary::default();
    let mut finished = 0usize;
    let mut rounds_total = 0usize;

    for outcome in outcomes {
        summary.runs += 1;
        match &outcome.outcome {
            Outcome::EnvyFree => summary.envy_free += 1,
            Outcome::Envious => summary.envious += 1,
            Outcome::Failed(kind) => {
                summary.failed += 1;
                *summary.failures.entry(kind.clone()).or_insert(0) += 1;
            }
        }
        if let Some(rounds) = outcome.rounds {
            finished += 1;
            rounds_total += rounds;
        }
    }

    if finished > 0 {
        summary.avg_rounds = Some(rounds_total as f64 / finished as f64);
    }
    summary
}
