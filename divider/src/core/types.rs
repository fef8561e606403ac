//! Shared deterministic types for the division protocol.
//!
//! Positions are plain `f64` cake coordinates. A [`Region`] is the canonical
//! form of any set of cake: sorted, disjoint, with touching segments merged
//! and empty segments dropped. Pieces, shares, and residues are all regions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::valuation::Valuation;

/// Index of an agent within one protocol run (agent "1" is index 0).
pub type AgentId = usize;

/// Number of agents the protocol divides the cake among.
pub const AGENT_COUNT: usize = 4;

/// Number of pieces a cutter produces in one CORE round.
pub const PIECE_COUNT: usize = 4;

/// Half-open interval `[start, end)` of cake positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.6}, {:.6})", self.start, self.end)
    }
}

/// Ordered, disjoint set of cake segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(Vec<Interval>);

/// A piece is a region cut out of a residue.
pub type Piece = Region;

impl Region {
    /// Canonicalize arbitrary intervals into a region.
    pub fn from_intervals(mut intervals: Vec<Interval>) -> Self {
        intervals.retain(|interval| !interval.is_empty());
        intervals.sort_by(|left, right| left.start.total_cmp(&right.start));
        let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
        for interval in intervals {
            match merged.last_mut() {
                Some(last) if interval.start <= last.end => last.end = last.end.max(interval.end),
                _ => merged.push(interval),
            }
        }
        Self(merged)
    }

    pub fn single(start: f64, end: f64) -> Self {
        Self::from_intervals(vec![Interval::new(start, end)])
    }

    /// The whole cake `[0, length)`.
    pub fn whole(length: f64) -> Self {
        Self::single(0.0, length)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[Interval] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn length(&self) -> f64 {
        self.0.iter().map(Interval::length).sum()
    }

    pub fn start(&self) -> Option<f64> {
        self.0.first().map(|segment| segment.start)
    }

    pub fn end(&self) -> Option<f64> {
        self.0.last().map(|segment| segment.end)
    }

    /// Value of the region to `agent`: the sum of `eval` over its segments.
    pub fn value(&self, agent: &dyn Valuation) -> f64 {
        self.0
            .iter()
            .map(|segment| agent.eval(segment.start, segment.end))
            .sum()
    }

    /// Split into the parts strictly left of `position` and from `position` on.
    pub fn split_at(&self, position: f64) -> (Region, Region) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for segment in &self.0 {
            if segment.end <= position {
                left.push(*segment);
            } else if segment.start >= position {
                right.push(*segment);
            } else {
                left.push(Interval::new(segment.start, position));
                right.push(Interval::new(position, segment.end));
            }
        }
        (Region(left), Region(right))
    }

    pub fn union(&self, other: &Region) -> Region {
        let mut intervals = self.0.clone();
        intervals.extend_from_slice(&other.0);
        Region::from_intervals(intervals)
    }

    pub fn intersect(&self, other: &Region) -> Region {
        let mut intervals = Vec::new();
        for left in &self.0 {
            for right in &other.0 {
                let start = left.start.max(right.start);
                let end = left.end.min(right.end);
                if end > start {
                    intervals.push(Interval::new(start, end));
                }
            }
        }
        Region::from_intervals(intervals)
    }

    /// Everything in `self` not covered by `other`.
    pub fn subtract(&self, other: &Region) -> Region {
        let mut intervals = Vec::new();
        for segment in &self.0 {
            let mut cursor = segment.start;
            for hole in &other.0 {
                if hole.end <= cursor || hole.start >= segment.end {
                    continue;
                }
                if hole.start > cursor {
                    intervals.push(Interval::new(cursor, hole.start));
                }
                cursor = cursor.max(hole.end);
                if cursor >= segment.end {
                    break;
                }
            }
            if cursor < segment.end {
                intervals.push(Interval::new(cursor, segment.end));
            }
        }
        Region::from_intervals(intervals)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(empty)");
        }
        for (index, segment) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
