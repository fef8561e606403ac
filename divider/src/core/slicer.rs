//! Equal-value partition of a (possibly fragmented) region.
//!
//! The cutter walks the region's segments in cake order, closing a part each
//! time the running value reaches its share. Parts may span several segments.

use crate::core::error::ProtocolError;
use crate::core::types::{Interval, PIECE_COUNT, Region};
use crate::core::valuation::Valuation;

/// Relative slack below which leftover value is treated as rounding noise.
const SLICE_SLACK: f64 = 1e-12;

/// Cut `residue` into four parts of equal value to `cutter`.
pub fn slice_into_four(residue: &Region, cutter: &dyn Valuation) -> Result<Vec<Region>, ProtocolError> {
    slice_into(residue, cutter, PIECE_COUNT)
}

/// Cut `residue` into `parts` contiguous parts of equal value to `cutter`.
///
/// The parts partition `residue` exactly. A residue the cutter values at zero
/// is split by length instead.
pub fn slice_into(
    residue: &Region,
    cutter: &dyn Valuation,
    parts: usize,
) -> Result<Vec<Region>, ProtocolError> {
    if parts == 0 {
        return Err(ProtocolError::DegenerateInput(
            "cannot slice into zero parts".to_string(),
        ));
    }
    if residue.is_empty() || residue.length() <= 0.0 {
        return Err(ProtocolError::DegenerateInput(format!(
            "{} cannot slice an empty residue",
            cutter.name()
        )));
    }
    let total = residue.value(cutter);
    if total <= 0.0 {
        return Ok(slice_by_length(residue, parts));
    }

    let share = total / parts as f64;
    let slack = SLICE_SLACK * total;
    let mut closed: Vec<Region> = Vec::with_capacity(parts);
    let mut current: Vec<Interval> = Vec::new();
    let mut need = share;

    for segment in residue.segments() {
        let mut position = segment.start;
        while position < segment.end {
            if closed.len() == parts - 1 {
                current.push(Interval::new(position, segment.end));
                break;
            }
            let available = cutter.eval(position, segment.end);
            if available + slack < need {
                current.push(Interval::new(position, segment.end));
                need -= available;
                break;
            }
            let cut = cutter
                .mark(position, need.min(available))
                .ok_or_else(|| {
                    ProtocolError::OracleInconsistency(format!(
                        "{} reports {:.12} in [{}, {}) but cannot mark {:.12}",
                        cutter.name(),
                        available,
                        position,
                        segment.end,
                        need
                    ))
                })?
                .clamp(position, segment.end);
            current.push(Interval::new(position, cut));
            closed.push(Region::from_intervals(std::mem::take(&mut current)));
            need = share;
            position = cut;
        }
    }
    closed.push(Region::from_intervals(current));
    while closed.len() < parts {
        closed.push(Region::empty());
    }
    Ok(closed)
}

/// Position inside `region` where the leading part reaches `target` for `agent`.
///
/// The leading part is `region ∩ (-inf, position)`. A non-positive target
/// marks the region's start.
pub fn mark_within(
    region: &Region,
    agent: &dyn Valuation,
    target: f64,
) -> Result<f64, ProtocolError> {
    let (Some(start), Some(end)) = (region.start(), region.end()) else {
        return Err(ProtocolError::DegenerateInput(format!(
            "{} cannot mark inside an empty region",
            agent.name()
        )));
    };
    if target <= 0.0 {
        return Ok(start);
    }
    let mut need = target;
    for segment in region.segments() {
        let available = agent.eval(segment.start, segment.end);
        if available >= need {
            let position = agent.mark(segment.start, need).ok_or_else(|| {
                ProtocolError::OracleInconsistency(format!(
                    "{} reports {:.12} in {} but cannot mark {:.12}",
                    agent.name(),
                    available,
                    segment,
                    need
                ))
            })?;
            return Ok(position.clamp(segment.start, segment.end));
        }
        need -= available;
    }
    if need <= SLICE_SLACK * target.max(1.0) {
        return Ok(end);
    }
    Err(ProtocolError::OracleInconsistency(format!(
        "{} cannot find {:.12} inside {}",
        agent.name(),
        target,
        region
    )))
}

fn slice_by_length(residue: &Region, parts: usize) -> Vec<Region> {
    let share = residue.length() / parts as f64;
    let mut closed: Vec<Region> = Vec::with_capacity(parts);
    let mut current: Vec<Interval> = Vec::new();
    let mut need = share;
    for segment in residue.segments() {
        let mut position = segment.start;
        while position < segment.end {
            if closed.len() == parts - 1 || segment.end - position < need {
                need -= segment.end - position;
                current.push(Interval::new(position, segment.end));
                break;
            }
            let cut = position + need;
            current.push(Interval::new(position, cut));
            closed.push(Region::from_intervals(std::mem::take(&mut current)));
            need = share;
            position = cut;
        }
    }
    closed.push(Region::from_intervals(current));
    while closed.len() < parts {
        closed.push(Region::empty());
    }
    closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{piecewise, region};

    const TOL: f64 = 1e-9;

    #[test]
    fn uniform_cutter_cuts_unit_quarters() {
        let cutter = piecewise("t", &[1.0, 1.0, 1.0, 1.0]);
        let parts = slice_into_four(&Region::whole(4.0), &cutter).expect("slice");
        assert_eq!(
            parts,
            vec![
                Region::single(0.0, 1.0),
                Region::single(1.0, 2.0),
                Region::single(2.0, 3.0),
                Region::single(3.0, 4.0),
            ]
        );
    }

    #[test]
    fn half_cake_cuts_at_half_units() {
        let cutter = piecewise("t", &[1.0, 1.0, 1.0, 1.0]);
        let parts = slice_into_four(&Region::single(0.0, 2.0), &cutter).expect("slice");
        let cuts: Vec<f64> = parts.iter().filter_map(Region::start).collect();
        assert_eq!(cuts, vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn skewed_cutter_gets_equal_values() {
        let cutter = piecewise("a", &[4.0, 3.0, 2.0, 1.0]);
        let parts = slice_into_four(&Region::whole(4.0), &cutter).expect("slice");
        for part in &parts {
            assert!((part.value(&cutter) - 2.5).abs() < TOL);
        }
        assert!((parts[1].start().expect("start") - 0.625).abs() < TOL);
        assert!((parts[2].start().expect("start") - 4.0 / 3.0).abs() < TOL);
        assert!((parts[3].start().expect("start") - 2.25).abs() < TOL);
    }

    #[test]
    fn parts_may_span_residue_fragments() {
        let cutter = piecewise("t", &[1.0, 1.0, 1.0, 1.0]);
        let residue = region(&[(0.0, 1.0), (3.0, 4.0)]);
        let parts = slice_into_four(&residue, &cutter).expect("slice");
        assert_eq!(parts[1], Region::single(0.5, 1.0));
        assert_eq!(parts[2], Region::single(3.0, 3.5));
        let rebuilt = parts
            .iter()
            .fold(Region::empty(), |acc, part| acc.union(part));
        assert_eq!(rebuilt, residue);
    }

    #[test]
    fn empty_residue_is_degenerate() {
        let cutter = piecewise("t", &[1.0, 1.0]);
        let err = slice_into_four(&Region::empty(), &cutter).expect_err("degenerate");
        assert!(matches!(err, ProtocolError::DegenerateInput(_)));
    }

    #[test]
    fn worthless_residue_splits_by_length() {
        let cutter = piecewise("z", &[1.0, 0.0]);
        let parts = slice_into_four(&Region::single(1.0, 2.0), &cutter).expect("slice");
        let lengths: Vec<f64> = parts.iter().map(Region::length).collect();
        assert_eq!(lengths, vec![0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn mark_within_walks_fragments() {
        let agent = piecewise("t", &[1.0, 1.0, 1.0, 1.0]);
        let residue = region(&[(0.0, 0.5), (2.0, 4.0)]);
        let position = mark_within(&residue, &agent, 1.0).expect("mark");
        assert_eq!(position, 2.5);
    }

    /// Reports uniform value but refuses every mark.
    struct Unmarkable;

    impl Valuation for Unmarkable {
        fn name(&self) -> &str {
            "unmarkable"
        }

        fn cake_length(&self) -> f64 {
            4.0
        }

        fn cake_value(&self) -> f64 {
            4.0
        }

        fn eval(&self, start: f64, end: f64) -> f64 {
            (end.min(4.0) - start.max(0.0)).max(0.0)
        }

        fn mark(&self, _start: f64, _target: f64) -> Option<f64> {
            None
        }
    }

    #[test]
    fn unmarkable_cutter_is_an_oracle_inconsistency() {
        let err = slice_into_four(&Region::whole(4.0), &Unmarkable).expect_err("inconsistent");
        assert!(matches!(err, ProtocolError::OracleInconsistency(_)));
    }

    #[test]
    fn mark_within_rejects_unmarkable_value() {
        let err = mark_within(&Region::single(0.0, 2.0), &Unmarkable, 1.0).expect_err("inconsistent");
        assert!(matches!(err, ProtocolError::OracleInconsistency(_)));
    }
}
