//! Exit codes of the `divider` binary.

use crate::core::error::ProtocolError;

/// The scenario was divided (or checked, or the config written).
pub const OK: i32 = 0;
/// The scenario, config file, or agents were rejected before dividing.
pub const INVALID: i32 = 1;
/// The protocol started and stopped on an oracle, marking, or invariant error.
pub const FAILED: i32 = 2;

/// Map a protocol error to the code the binary exits with.
///
/// Bad agents are caught before the first round and count as invalid input.
pub fn for_protocol_error(err: &ProtocolError) -> i32 {
    match err {
        ProtocolError::InvalidAgents(_) => INVALID,
        ProtocolError::DegenerateInput(_)
        | ProtocolError::OracleInconsistency(_)
        | ProtocolError::MarkingAmbiguity(_)
        | ProtocolError::UnsatisfiableCorrection(_)
        | ProtocolError::InvariantViolation(_) => FAILED,
    }
}
