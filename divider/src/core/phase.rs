//! Phase bookkeeping for the orchestrator.

use std::fmt;

use serde::Serialize;

use crate::core::domination::DominationMatrix;
use crate::core::types::AgentId;

/// Where a protocol run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "round", rename_all = "snake_case")]
pub enum Phase {
    /// Repeated rounds with the first agent cutting.
    PhaseOne(u32),
    /// The extra first-agent round and the round cut by an undominated agent.
    DominationCheck,
    /// Rounds cut by the agent outside the dominated triple.
    PhaseTwo(u32),
    /// Fallback rounds with a rotating cutter.
    Settle(u32),
    /// A terminal division finishes the residue.
    FinalDivision,
    Done,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PhaseOne(_) => "phase_one",
            Self::DominationCheck => "domination_check",
            Self::PhaseTwo(_) => "phase_two",
            Self::Settle(_) => "settle",
            Self::FinalDivision => "final_division",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PhaseOne(round) | Self::PhaseTwo(round) | Self::Settle(round) => {
                write!(f, "{}[{}]", self.label(), round)
            }
            _ => write!(f, "{}", self.label()),
        }
    }
}

/// Role assignment for Phase Two.
///
/// `a` is dominated by both `b` and `c`; `d` is the remaining agent and cuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Roles {
    pub a: AgentId,
    pub b: AgentId,
    pub c: AgentId,
    pub d: AgentId,
}

impl Roles {
    /// Pick the first agent dominated by two others as `a`.
    ///
    /// Without one, `a` is the agent with the most dominators and the missing
    /// `b`/`c` are filled with the lowest remaining ids.
    pub fn assign(matrix: &DominationMatrix) -> Self {
        let count = matrix.agent_count();
        let mut a = 0;
        let mut most = 0;
        for agent in 0..count {
            let dominators = matrix.dominators(agent).len();
            if dominators >= 2 {
                a = agent;
                break;
            }
            if dominators > most {
                a = agent;
                most = dominators;
            }
        }
        let mut helpers: Vec<AgentId> = matrix.dominators(a);
        helpers.truncate(2);
        for agent in 0..count {
            if helpers.len() == 2 {
                break;
            }
            if agent != a && !helpers.contains(&agent) {
                helpers.push(agent);
            }
        }
        let (b, c) = (helpers[0], helpers[1]);
        let d = (0..count)
            .find(|agent| ![a, b, c].contains(agent))
            .unwrap_or(a);
        Self { a, b, c, d }
    }
}

/// Explicit phase state carried between orchestrator steps.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseState {
    pub phase: Phase,
    pub last_cutter: AgentId,
    pub roles: Option<Roles>,
    /// Untrimmed recipients of each Phase One round.
    pub phase_one_untrimmed: Vec<Vec<AgentId>>,
}

impl PhaseState {
    pub fn new() -> Self {
        Self {
            phase: Phase::PhaseOne(0),
            last_cutter: 0,
            roles: None,
            phase_one_untrimmed: Vec::new(),
        }
    }

    /// The competitor that took a whole piece in every Phase One round.
    pub fn persistent_untrimmed(&self) -> Option<AgentId> {
        let (first, rest) = self.phase_one_untrimmed.split_first()?;
        first
            .iter()
            .copied()
            .find(|agent| rest.iter().all(|round| round.contains(agent)))
    }
}

impl Default for PhaseState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::allocation::Allocation;
    use crate::core::types::Region;
    use crate::test_support::agents;

    const TOL: f64 = 1e-9;

    #[test]
    fn roles_pick_agent_dominated_twice() {
        let agents = agents(&[
            &[1.0, 1.0, 1.0, 1.0],
            &[1.0, 1.0, 1.0, 1.0],
            &[1.0, 1.0, 1.0, 1.0],
            &[1.0, 1.0, 1.0, 1.0],
        ]);
        let mut allocation = Allocation::empty(4);
        allocation.grant(0, &Region::single(0.0, 1.0));
        allocation.grant(1, &Region::single(1.0, 2.0));
        allocation.grant(2, &Region::single(2.0, 2.5));
        allocation.grant(3, &Region::single(2.5, 3.5));
        let residue = Region::single(3.5, 4.0);
        let matrix = DominationMatrix::compute(&agents, &allocation, &residue, TOL);
        assert_eq!(matrix.dominators(2), vec![0, 1, 3]);
        let roles = Roles::assign(&matrix);
        assert_eq!(roles, Roles { a: 2, b: 0, c: 1, d: 3 });
    }

    #[test]
    fn persistent_untrimmed_needs_every_round() {
        let mut state = PhaseState::new();
        state.phase_one_untrimmed = vec![vec![1, 2], vec![2, 3], vec![2]];
        assert_eq!(state.persistent_untrimmed(), Some(2));
        state.phase_one_untrimmed.push(vec![1]);
        assert_eq!(state.persistent_untrimmed(), None);
    }

    #[test]
    fn phase_display_includes_round() {
        assert_eq!(Phase::PhaseTwo(1).to_string(), "phase_two[1]");
        assert_eq!(Phase::DominationCheck.to_string(), "domination_check");
    }
}
