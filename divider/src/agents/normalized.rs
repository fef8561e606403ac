//! Adapter presenting any agent as a unit cake of unit value.

use crate::core::valuation::Valuation;

/// Wraps an agent so that `cake_length() == 1.0` and `cake_value() == 1.0`.
///
/// Positions are scaled by the inner cake length and values by the inner cake
/// value; relative preferences are unchanged.
#[derive(Debug, Clone)]
pub struct Normalized<A> {
    inner: A,
}

impl<A: Valuation> Normalized<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A: Valuation> Valuation for Normalized<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn cake_length(&self) -> f64 {
        1.0
    }

    fn cake_value(&self) -> f64 {
        1.0
    }

    fn eval(&self, start: f64, end: f64) -> f64 {
        let start = start.clamp(0.0, 1.0);
        let end = end.clamp(0.0, 1.0);
        let length = self.inner.cake_length();
        self.inner.eval(start * length, end * length) / self.inner.cake_value()
    }

    fn mark(&self, start: f64, target: f64) -> Option<f64> {
        let start = start.clamp(0.0, 1.0);
        let length = self.inner.cake_length();
        self.inner
            .mark(start * length, target * self.inner.cake_value())
            .map(|position| position / length)
    }
}
