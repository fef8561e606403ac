//! Piecewise-constant valuation over unit-length segments.

use crate::core::error::ProtocolError;
use crate::core::valuation::Valuation;

/// Relative slack for `mark` when the target equals the remaining value up
/// to rounding.
const MARK_SLACK: f64 = 1e-12;

/// An agent whose density is constant on each unit segment `[i, i + 1)`.
///
/// `values = [4, 3, 2, 1]` describes a cake of length 4 worth 10.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseConstant {
    name: String,
    values: Vec<f64>,
    total: f64,
}

impl PiecewiseConstant {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Result<Self, ProtocolError> {
        let name = name.into();
        if values.is_empty() {
            return Err(ProtocolError::InvalidAgents(format!(
                "agent '{}' has no segments",
                name
            )));
        }
        if let Some(bad) = values.iter().find(|value| !value.is_finite() || **value < 0.0) {
            return Err(ProtocolError::InvalidAgents(format!(
                "agent '{}' has invalid density {}",
                name, bad
            )));
        }
        let total: f64 = values.iter().sum();
        if total <= 0.0 {
            return Err(ProtocolError::InvalidAgents(format!(
                "agent '{}' values the whole cake at zero",
                name
            )));
        }
        Ok(Self {
            name,
            values,
            total,
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn clamp(&self, position: f64) -> f64 {
        position.clamp(0.0, self.cake_length())
    }
}

impl Valuation for PiecewiseConstant {
    fn name(&self) -> &str {
        &self.name
    }

    fn cake_length(&self) -> f64 {
        self.values.len() as f64
    }

    fn cake_value(&self) -> f64 {
        self.total
    }

    fn eval(&self, start: f64, end: f64) -> f64 {
        let start = self.clamp(start);
        let end = self.clamp(end);
        if end <= start {
            return 0.0;
        }
        let mut total = 0.0;
        for (index, density) in self.values.iter().enumerate() {
            let low = (index as f64).max(start);
            let high = ((index + 1) as f64).min(end);
            if high > low {
                total += density * (high - low);
            }
        }
        total
    }

    fn mark(&self, start: f64, target: f64) -> Option<f64> {
        let start = self.clamp(start);
        if target <= 0.0 {
            return Some(start);
        }
        let mut remaining = target;
        let mut last = start;
        for (index, density) in self.values.iter().enumerate() {
            let segment_end = (index + 1) as f64;
            if segment_end <= start || *density <= 0.0 {
                continue;
            }
            let low = (index as f64).max(start);
            let available = density * (segment_end - low);
            if remaining <= available {
                return Some((low + remaining / density).min(segment_end));
            }
            remaining -= available;
            last = segment_end;
        }
        if remaining <= MARK_SLACK * target.max(1.0) {
            Some(last)
        } else {
            None
        }
    }
}
