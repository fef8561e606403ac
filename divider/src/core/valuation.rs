//! Valuation oracle contract consumed by the protocol.
//!
//! Agents reveal preferences only through `eval` and `mark`. The protocol
//! assumes both are pure for the duration of a run: identical arguments must
//! produce identical results.

/// Capability set of one agent.
pub trait Valuation {
    /// Display name used in logs and reports.
    fn name(&self) -> &str;

    /// Length of the cake as seen by this agent.
    fn cake_length(&self) -> f64;

    /// Value of the whole cake to this agent.
    fn cake_value(&self) -> f64;

    /// Value of `[start, end)`, additive over concatenation, `0` when empty.
    ///
    /// Arguments are clamped to `[0, cake_length]`.
    fn eval(&self, start: f64, end: f64) -> f64;

    /// Smallest `position >= start` with `eval(start, position) == target`.
    ///
    /// Returns `None` when `target` exceeds `eval(start, cake_length)`.
    fn mark(&self, start: f64, target: f64) -> Option<f64>;
}

impl<V: Valuation + ?Sized> Valuation for Box<V> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn cake_length(&self) -> f64 {
        (**self).cake_length()
    }

    fn cake_value(&self) -> f64 {
        (**self).cake_value()
    }

    fn eval(&self, start: f64, end: f64) -> f64 {
        (**self).eval(start, end)
    }

    fn mark(&self, start: f64, target: f64) -> Option<f64> {
        (**self).mark(start, target)
    }
}

/// The agents taking part in one run, indexed by [`AgentId`](crate::core::types::AgentId).
pub type Agents = [Box<dyn Valuation>];
