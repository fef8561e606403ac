//! Concrete valuation oracles.
//!
//! The protocol only ever sees the [`Valuation`](crate::core::valuation::Valuation)
//! contract; these implementations back scenarios, the CLI, and tests.

pub mod normalized;
pub mod piecewise;

pub use normalized::Normalized;
pub use piecewise::PiecewiseConstant;
