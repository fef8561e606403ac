//! Envy-free division of a continuous cake among four agents.
//!
//! Agents reveal their preferences only through `eval` and `mark` queries.
//! The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic protocol logic (slicing, CORE rounds,
//!   marks, domination, corrections, terminal divisions). No I/O.
//! - **[`agents`]**: Concrete valuation oracles.
//! - **[`io`]**: Configuration and scenario files.
//!
//! [`protocol`] sequences the phases and owns the allocation of a run.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod protocol;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
