use divider::core::error::ProtocolError;
use divider::core::invariants::{check_partition, envy_violations};
use divider::core::types::Region;
use divider::core::valuation::Agents;
use divider::protocol::ProtocolReport;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", content = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The run finished and an independent recheck found no envy.
    EnvyFree,
    /// The run finished but the recheck found envy or a broken partition.
    Envious,
    /// The run aborted with the given error kind.
    Failed(String),
}

/// Classify a run, rechecking successful reports against the agents.
pub fn classify_outcome(
    agents: &Agents,
    result: &Result<ProtocolReport, ProtocolError>,
    tolerance: f64,
) -> Outcome {
    match result {
        Ok(report) => {
            let cake = Region::whole(agents[0].cake_length());
            let mut problems = check_partition(&cake, &report.allocation, &Region::empty());
            problems.extend(envy_violations(agents, &report.allocation, tolerance));
            if problems.is_empty() {
                Outcome::EnvyFree
            } else {
                Outcome::Envious
            }
        }
        Err(err) => Outcome::Failed(err.kind().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use divider::core::allocation::Allocation;
    use divider::test_support::agents;

    fn report(allocation: Allocation) -> ProtocolReport {
        ProtocolReport {
            agents: Vec::new(),
            allocation,
            rounds: Vec::new(),
            corrections: Vec::new(),
            division: None,
            values: Vec::new(),
        }
    }

    #[test]
    fn envy_free_when_recheck_passes() {
        let agents = agents(&[&[1.0, 1.0], &[1.0, 1.0]]);
        let mut allocation = Allocation::empty(2);
        allocation.grant(0, &Region::single(0.0, 1.0));
        allocation.grant(1, &Region::single(1.0, 2.0));
        let outcome = classify_outcome(&agents, &Ok(report(allocation)), 1e-9);
        assert_eq!(outcome, Outcome::EnvyFree);
    }

    #[test]
    fn envious_when_recheck_fails() {
        let agents = agents(&[&[1.0, 1.0], &[1.0, 1.0]]);
        let mut allocation = Allocation::empty(2);
        allocation.grant(0, &Region::single(0.0, 0.5));
        allocation.grant(1, &Region::single(0.5, 2.0));
        let outcome = classify_outcome(&agents, &Ok(report(allocation)), 1e-9);
        assert_eq!(outcome, Outcome::Envious);
    }

    #[test]
    fn failed_carries_error_kind() {
        let agents = agents(&[&[1.0, 1.0], &[1.0, 1.0]]);
        let result = Err(ProtocolError::MarkingAmbiguity("x".to_string()));
        let outcome = classify_outcome(&agents, &result, 1e-9);
        assert_eq!(outcome, Outcome::Failed("marking_ambiguity".to_string()));
    }
}
