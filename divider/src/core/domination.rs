//! Domination between agents and the terminal decision table.

use serde::Serialize;

use crate::core::allocation::Allocation;
use crate::core::types::{AgentId, Region};
use crate::core::valuation::Agents;

/// `x` dominates `y` when `x` cannot come to envy `y`, whatever part of
/// `residue` `y` still receives.
pub fn dominates(
    agents: &Agents,
    allocation: &Allocation,
    residue: &Region,
    x: AgentId,
    y: AgentId,
    tolerance: f64,
) -> bool {
    x != y
        && allocation.advantage(agents, x, y) >= residue.value(agents[x].as_ref()) - tolerance
}

/// Pairwise domination relation over every agent of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DominationMatrix {
    relation: Vec<Vec<bool>>,
}

impl DominationMatrix {
    pub fn compute(
        agents: &Agents,
        allocation: &Allocation,
        residue: &Region,
        tolerance: f64,
    ) -> Self {
        let count = agents.len();
        let relation = (0..count)
            .map(|x| {
                (0..count)
                    .map(|y| dominates(agents, allocation, residue, x, y, tolerance))
                    .collect()
            })
            .collect();
        Self { relation }
    }

    pub fn agent_count(&self) -> usize {
        self.relation.len()
    }

    pub fn dominates(&self, x: AgentId, y: AgentId) -> bool {
        self.relation[x][y]
    }

    /// Agents that dominate `y`, ascending.
    pub fn dominators(&self, y: AgentId) -> Vec<AgentId> {
        (0..self.agent_count())
            .filter(|x| self.dominates(*x, y))
            .collect()
    }
}

/// How the last residue is split among the agents that may still want it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Division {
    /// Every agent values the residue at nothing; the last cutter keeps it.
    Negligible { receiver: AgentId },
    /// Everyone else dominates `receiver`, who takes the whole residue.
    Whole { receiver: AgentId },
    /// `cutter` halves the residue and `chooser` picks a half.
    CutAndChoose { cutter: AgentId, chooser: AgentId },
    /// The outside agent dominates all three receivers.
    SelfridgeConway { receivers: [AgentId; 3] },
}

/// First receiver set, by size then lexicographically, that every outsider
/// dominates. `None` when no terminal division is safe yet.
pub fn terminal_division(matrix: &DominationMatrix) -> Option<Division> {
    let count = matrix.agent_count();
    for size in 1..count {
        for receivers in combinations(count, size) {
            let outsiders: Vec<AgentId> = (0..count).filter(|agent| !receivers.contains(agent)).collect();
            let safe = outsiders.iter().all(|outsider| {
                receivers
                    .iter()
                    .all(|receiver| matrix.dominates(*outsider, *receiver))
            });
            if !safe {
                continue;
            }
            return match receivers.as_slice() {
                [receiver] => Some(Division::Whole {
                    receiver: *receiver,
                }),
                [cutter, chooser] => Some(Division::CutAndChoose {
                    cutter: *cutter,
                    chooser: *chooser,
                }),
                [first, second, third] => Some(Division::SelfridgeConway {
                    receivers: [*first, *second, *third],
                }),
                _ => None,
            };
        }
    }
    None
}

/// Ascending `size`-subsets of `0..count` in lexicographic order.
fn combinations(count: usize, size: usize) -> Vec<Vec<usize>> {
    if size == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    for first in 0..count {
        for rest in combinations(count, size - 1) {
            if rest.first().is_none_or(|next| *next > first) {
                let mut subset = vec![first];
                subset.extend(rest);
                out.push(subset);
            }
        }
    }
    out
}
