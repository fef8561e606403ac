//! Case execution: build agents, run the protocol, classify the result.

use anyhow::{Context, Result};
use divider::io::config::ProtocolConfig;
use divider::protocol::run_protocol;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::case::CaseFile;
use crate::config::apply_case_config;
use crate::outcome::{Outcome, classify_outcome};

/// Result of running a single case once.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunOutcome {
    /// 0-based run number.
    pub run: u32,
    pub outcome: Outcome,
    /// CORE rounds committed; `None` when the run failed.
    pub rounds: Option<usize>,
    pub corrections: Option<usize>,
}

/// Run a case once: agents for `run`, protocol, independent recheck.
#[instrument(skip_all, fields(case_id = %case.case.id, run = run))]
pub fn run_case(case: &CaseFile, run: u32) -> Result<RunOutcome> {
    let config = apply_case_config(ProtocolConfig::default(), &case.config)?;
    let agents = case.build_agents(run).context("build agents")?;
    debug!("agents built");

    let result = run_protocol(&agents, &config);
    let outcome = classify_outcome(&agents, &result, config.tolerance);
    info!(outcome = ?outcome, "case run complete");

    let (rounds, corrections) = match &result {
        Ok(report) => (Some(report.rounds.len()), Some(report.corrections.len())),
        Err(_) => (None, None),
    };
    Ok(RunOutcome {
        run,
        outcome,
        rounds,
        corrections,
    })
}
