//! Semantic invariants of a run: exact partition and envy-freeness.

use crate::core::allocation::Allocation;
use crate::core::types::{AgentId, Interval, Region};
use crate::core::valuation::Agents;

/// Check that shares and residue tile `cake` with no overlap and no gap.
///
/// Returns stable error messages (empty on success).
pub fn check_partition(cake: &Region, allocation: &Allocation, residue: &Region) -> Vec<String> {
    let mut labelled: Vec<(Interval, String)> = Vec::new();
    for (agent, share) in allocation.shares().iter().enumerate() {
        for segment in share.segments() {
            labelled.push((*segment, format!("agent {}", agent)));
        }
    }
    for segment in residue.segments() {
        labelled.push((*segment, "residue".to_string()));
    }
    labelled.sort_by(|left, right| left.0.start.total_cmp(&right.0.start));

    let mut errors = Vec::new();
    for pair in labelled.windows(2) {
        let (left, left_owner) = &pair[0];
        let (right, right_owner) = &pair[1];
        if right.start < left.end {
            errors.push(format!(
                "{} {} overlaps {} {}",
                left_owner, left, right_owner, right
            ));
        }
    }

    let covered = Region::from_intervals(labelled.iter().map(|(segment, _)| *segment).collect());
    if covered != *cake {
        errors.push(format!("pieces cover {} but the cake is {}", covered, cake));
    }
    errors
}

/// Report every ordered pair `(i, j)` where `i` values `j`'s share above its own.
pub fn envy_violations(agents: &Agents, allocation: &Allocation, tolerance: f64) -> Vec<String> {
    let holdings: Vec<(AgentId, &Region)> = allocation.shares().iter().enumerate().collect();
    local_envy_violations(agents, &holdings, tolerance)
}

/// Envy check restricted to the given holdings (e.g. one CORE round).
pub fn local_envy_violations(
    agents: &Agents,
    holdings: &[(AgentId, &Region)],
    tolerance: f64,
) -> Vec<String> {
    let mut errors = Vec::new();
    for (agent, own) in holdings {
        let valuation = agents[*agent].as_ref();
        let own_value = own.value(valuation);
        for (other, theirs) in holdings {
            if other == agent {
                continue;
            }
            let their_value = theirs.value(valuation);
            if their_value > own_value + tolerance {
                errors.push(format!(
                    "agent {} envies agent {} ({:.9} > {:.9})",
                    agent, other, their_value, own_value
                ));
            }
        }
    }
    errors
}
