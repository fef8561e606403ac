//! Deterministic, pure protocol logic.
//!
//! Core modules must be free of I/O side effects. They operate on regions of
//! cake and valuation oracles and return deterministic outputs suitable for
//! tests.

pub mod allocation;
pub mod correction;
pub mod division;
pub mod domination;
pub mod error;
pub mod invariants;
pub mod marks;
pub mod phase;
pub mod round;
pub mod slicer;
pub mod types;
pub mod valuation;
