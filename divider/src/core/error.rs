//! Error kinds that abort a protocol run.
//!
//! Every kind is terminal: the protocol is deterministic, so retrying would
//! reproduce the same failure. Partial allocations are never returned.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// A region to be divided is empty or has zero length.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// An oracle answered `mark` inconsistently with its own `eval`.
    #[error("oracle inconsistency: {0}")]
    OracleInconsistency(String),

    /// No 2-mark/3-mark assignment yields a locally envy-free round.
    #[error("marking ambiguity: {0}")]
    MarkingAmbiguity(String),

    /// No donor transfer restores the required domination.
    #[error("unsatisfiable correction: {0}")]
    UnsatisfiableCorrection(String),

    /// The run was not given exactly four agents over one shared cake.
    #[error("invalid agents: {0}")]
    InvalidAgents(String),

    /// A post-step check of the partition or envy-freeness failed.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl ProtocolError {
    /// Stable snake_case label used by reports and the eval harness.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DegenerateInput(_) => "degenerate_input",
            Self::OracleInconsistency(_) => "oracle_inconsistency",
            Self::MarkingAmbiguity(_) => "marking_ambiguity",
            Self::UnsatisfiableCorrection(_) => "unsatisfiable_correction",
            Self::InvalidAgents(_) => "invalid_agents",
            Self::InvariantViolation(_) => "invariant_violation",
        }
    }
}
