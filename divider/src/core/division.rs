//! Terminal divisions of a residue among two or three agents.

use tracing::debug;

use crate::core::error::ProtocolError;
use crate::core::marks::{ranking, trim_point};
use crate::core::slicer::slice_into;
use crate::core::types::{AgentId, Region};
use crate::core::valuation::Agents;

/// Grants produced by a terminal division, in award order.
pub type Grants = Vec<(AgentId, Region)>;

/// `cutter` halves `residue` by its own valuation; `chooser` takes the half
/// it values more (tie: the first half).
pub fn cut_and_choose(
    agents: &Agents,
    residue: &Region,
    cutter: AgentId,
    chooser: AgentId,
    tolerance: f64,
) -> Result<Grants, ProtocolError> {
    let halves = slice_into(residue, agents[cutter].as_ref(), 2)?;
    let valuation = agents[chooser].as_ref();
    let pick = usize::from(halves[1].value(valuation) > halves[0].value(valuation) + tolerance);
    debug!(cutter, chooser, pick, "cut and choose");
    Ok(vec![
        (chooser, halves[pick].clone()),
        (cutter, halves[1 - pick].clone()),
    ])
}

/// Envy-free division of `residue` among three agents.
///
/// Stage one: `a` cuts three equal pieces, `b` trims its favorite down to its
/// second favorite, `c` chooses, `b` takes the trimmed piece if still there,
/// `a` takes the last. Stage two splits the trimming: the agent without the
/// trimmed piece cuts it in three, the trimmed piece's holder picks first,
/// then `a`, then the cutter.
pub fn selfridge_conway(
    agents: &Agents,
    residue: &Region,
    [a, b, c]: [AgentId; 3],
    tolerance: f64,
) -> Result<Grants, ProtocolError> {
    let mut pieces = slice_into(residue, agents[a].as_ref(), 3)?;

    let b_order = ranking(&pieces, agents[b].as_ref(), tolerance);
    let (best, runner_up) = (b_order[0], b_order[1]);
    let best_value = pieces[best].value(agents[b].as_ref());
    let runner_up_value = pieces[runner_up].value(agents[b].as_ref());
    let mut trimming = Region::empty();
    let mut trimmed_piece = None;
    if best_value > runner_up_value + tolerance {
        let cut = trim_point(&pieces[best], agents[b].as_ref(), runner_up_value, tolerance)?;
        let (left, right) = pieces[best].split_at(cut);
        trimming = left;
        pieces[best] = right;
        trimmed_piece = Some(best);
    }

    let mut remaining: Vec<usize> = vec![0, 1, 2];
    let mut grants: Grants = Vec::new();
    let c_pick = choose(&pieces, &remaining, agents, c, tolerance);
    remaining.retain(|index| *index != c_pick);
    grants.push((c, pieces[c_pick].clone()));

    let b_pick = match trimmed_piece {
        Some(index) if remaining.contains(&index) => index,
        _ => choose(&pieces, &remaining, agents, b, tolerance),
    };
    remaining.retain(|index| *index != b_pick);
    grants.push((b, pieces[b_pick].clone()));
    let a_pick = remaining[0];
    grants.push((a, pieces[a_pick].clone()));
    debug!(a, b, c, trimmed = trimmed_piece.is_some(), "selfridge-conway stage one");

    if trimming.is_empty() || trimming.length() <= 0.0 {
        return Ok(grants);
    }

    let (holder, splitter) = if Some(c_pick) == trimmed_piece {
        (c, b)
    } else {
        (b, c)
    };
    let parts = slice_into(&trimming, agents[splitter].as_ref(), 3)?;
    let mut left: Vec<usize> = vec![0, 1, 2];
    for agent in [holder, a, splitter] {
        let pick = choose(&parts, &left, agents, agent, tolerance);
        left.retain(|index| *index != pick);
        grants.push((agent, parts[pick].clone()));
    }
    debug!(holder, splitter, "selfridge-conway stage two");
    Ok(grants)
}

/// `agent`'s favorite among the `remaining` pieces (tie: lowest index).
fn choose(
    pieces: &[Region],
    remaining: &[usize],
    agents: &Agents,
    agent: AgentId,
    tolerance: f64,
) -> usize {
    ranking(pieces, agents[agent].as_ref(), tolerance)
        .into_iter()
        .find(|index| remaining.contains(index))
        .unwrap_or(remaining[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::invariants::local_envy_violations;
    use crate::test_support::agents;

    const TOL: f64 = 1e-9;

    fn merged(grants: &Grants, agent_count: usize) -> Vec<Region> {
        let mut shares = vec![Region::empty(); agent_count];
        for (agent, region) in grants {
            shares[*agent] = shares[*agent].union(region);
        }
        shares
    }

    #[test]
    fn chooser_takes_the_better_half() {
        let agents = agents(&[&[1.0, 1.0, 1.0, 1.0], &[0.0, 0.0, 1.0, 3.0]]);
        let grants = cut_and_choose(&agents, &Region::whole(4.0), 0, 1, TOL).expect("divide");
        assert_eq!(
            grants,
            vec![(1, Region::single(2.0, 4.0)), (0, Region::single(0.0, 2.0))]
        );
    }

    #[test]
    fn chooser_takes_first_half_on_tie() {
        let agents = agents(&[&[1.0, 1.0], &[1.0, 1.0]]);
        let grants = cut_and_choose(&agents, &Region::whole(2.0), 0, 1, TOL).expect("divide");
        assert_eq!(grants[0], (1, Region::single(0.0, 1.0)));
    }

    #[test]
    fn selfridge_conway_is_envy_free_and_exhaustive() {
        let agents = agents(&[
            &[1.0, 1.0, 1.0, 1.0],
            &[1.0, 1.0, 1.0, 1.0],
            &[4.0, 1.0, 1.0, 2.0],
            &[1.0, 3.0, 1.0, 3.0],
        ]);
        let residue = Region::whole(4.0);
        let grants = selfridge_conway(&agents, &residue, [1, 2, 3], TOL).expect("divide");
        let shares = merged(&grants, 4);
        let rebuilt = shares.iter().fold(Region::empty(), |acc, share| acc.union(share));
        assert_eq!(rebuilt, residue);
        let holdings: Vec<(AgentId, &Region)> = (1..4).map(|agent| (agent, &shares[agent])).collect();
        assert!(local_envy_violations(&agents, &holdings, 1e-7).is_empty());
    }

    #[test]
    fn selfridge_conway_without_trim_skips_stage_two() {
        let agents = agents(&[
            &[1.0, 1.0, 1.0],
            &[1.0, 1.0, 1.0],
            &[1.0, 1.0, 1.0],
        ]);
        let grants = selfridge_conway(&agents, &Region::whole(3.0), [0, 1, 2], TOL).expect("divide");
        assert_eq!(
            grants,
            vec![
                (2, Region::single(0.0, 1.0)),
                (1, Region::single(1.0, 2.0)),
                (0, Region::single(2.0, 3.0)),
            ]
        );
    }
}
