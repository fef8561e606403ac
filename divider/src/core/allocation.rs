//! Bookkeeping of which agent owns which cake.

use serde::Serialize;

use crate::core::types::{AgentId, Region};
use crate::core::valuation::Agents;

/// Mapping from each agent to the region it owns.
///
/// Shares of different agents never overlap; together with the residue they
/// reconstruct the cake (see [`check_partition`](crate::core::invariants::check_partition)).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    shares: Vec<Region>,
}

impl Allocation {
    pub fn empty(agent_count: usize) -> Self {
        Self {
            shares: vec![Region::empty(); agent_count],
        }
    }

    pub fn agent_count(&self) -> usize {
        self.shares.len()
    }

    pub fn share(&self, agent: AgentId) -> &Region {
        &self.shares[agent]
    }

    pub fn shares(&self) -> &[Region] {
        &self.shares
    }

    pub fn grant(&mut self, agent: AgentId, region: &Region) {
        self.shares[agent] = self.shares[agent].union(region);
    }

    /// Move the part of `region` owned by `from` over to `to`.
    pub fn transfer(&mut self, from: AgentId, to: AgentId, region: &Region) {
        let moved = self.shares[from].intersect(region);
        self.shares[from] = self.shares[from].subtract(&moved);
        self.shares[to] = self.shares[to].union(&moved);
    }

    /// `v_x(A_x) - v_x(A_y)`: how far `x` is from envying `y`.
    pub fn advantage(&self, agents: &Agents, x: AgentId, y: AgentId) -> f64 {
        let valuation = agents[x].as_ref();
        self.shares[x].value(valuation) - self.shares[y].value(valuation)
    }

    /// `values[i][j]` is agent `i`'s value of agent `j`'s share.
    pub fn value_matrix(&self, agents: &Agents) -> Vec<Vec<f64>> {
        agents
            .iter()
            .map(|agent| {
                self.shares
                    .iter()
                    .map(|share| share.value(agent.as_ref()))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::agents;

    #[test]
    fn transfer_moves_only_owned_cake() {
        let mut allocation = Allocation::empty(2);
        allocation.grant(0, &Region::single(0.0, 2.0));
        allocation.transfer(0, 1, &Region::single(1.5, 3.0));
        assert_eq!(allocation.share(0), &Region::single(0.0, 1.5));
        assert_eq!(allocation.share(1), &Region::single(1.5, 2.0));
    }

    #[test]
    fn value_matrix_rows_follow_valuations() {
        let agents = agents(&[&[1.0, 1.0, 1.0, 1.0], &[4.0, 0.0, 0.0, 0.0]]);
        let mut allocation = Allocation::empty(2);
        allocation.grant(0, &Region::single(0.0, 1.0));
        allocation.grant(1, &Region::single(1.0, 4.0));
        assert_eq!(
            allocation.value_matrix(&agents),
            vec![vec![1.0, 3.0], vec![4.0, 0.0]]
        );
        assert_eq!(allocation.advantage(&agents, 1, 0), 4.0);
    }
}
