//! CORRECTION: move cake from a donor so the beneficiary dominates it.

use serde::Serialize;
use tracing::debug;

use crate::core::allocation::Allocation;
use crate::core::domination::dominates;
use crate::core::error::ProtocolError;
use crate::core::invariants::envy_violations;
use crate::core::slicer::mark_within;
use crate::core::types::{AgentId, Region};
use crate::core::valuation::Agents;

/// A committed transfer from `donor` to `beneficiary`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transfer {
    pub beneficiary: AgentId,
    pub donor: AgentId,
    pub moved: Region,
}

/// Make `beneficiary` dominate `donor` with respect to `residue`.
///
/// The gap is `v_x(residue) - (v_x(A_x) - v_x(A_y))` for beneficiary `x` and
/// donor `y`. Each candidate (intersected with the donor's share) is tried in
/// order: its leftmost part worth half the gap to `x` moves from `y` to `x`,
/// which closes the gap exactly. The first candidate that leaves the whole
/// allocation envy-free wins. The input allocation is never modified.
pub fn correct(
    agents: &Agents,
    allocation: &Allocation,
    residue: &Region,
    beneficiary: AgentId,
    donor: AgentId,
    candidates: &[Region],
    tolerance: f64,
) -> Result<(Allocation, Option<Transfer>), ProtocolError> {
    let valuation = agents[beneficiary].as_ref();
    let gap = residue.value(valuation) - allocation.advantage(agents, beneficiary, donor);
    if gap <= tolerance {
        return Ok((allocation.clone(), None));
    }
    let half = gap / 2.0;

    for candidate in candidates {
        let owned = candidate.intersect(allocation.share(donor));
        if owned.is_empty() || owned.value(valuation) + tolerance < half {
            continue;
        }
        let cut = mark_within(&owned, valuation, half)?;
        let moved = owned.split_at(cut).0;
        let mut corrected = allocation.clone();
        corrected.transfer(donor, beneficiary, &moved);

        let envy = envy_violations(agents, &corrected, tolerance);
        if envy.is_empty()
            && dominates(agents, &corrected, residue, beneficiary, donor, tolerance)
        {
            debug!(beneficiary, donor, gap, moved = %moved, "correction applied");
            return Ok((
                corrected,
                Some(Transfer {
                    beneficiary,
                    donor,
                    moved,
                }),
            ));
        }
        debug!(beneficiary, donor, candidate = %candidate, ?envy, "correction candidate rejected");
    }

    Err(ProtocolError::UnsatisfiableCorrection(format!(
        "no piece of agent {} lets agent {} close a gap of {:.9}",
        donor, beneficiary, gap
    )))
}
