//! The four-agent orchestrator: Phase One, the domination check, Phase Two,
//! corrections, and the terminal division.
//!
//! The orchestrator exclusively owns the [`Allocation`] and the residue. Each
//! CORE round is computed in full before anything is committed, and any error
//! aborts the run without returning partial results.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::allocation::Allocation;
use crate::core::correction::{Transfer, correct};
use crate::core::division::{Grants, cut_and_choose, selfridge_conway};
use crate::core::domination::{Division, DominationMatrix, terminal_division};
use crate::core::error::ProtocolError;
use crate::core::invariants::{check_partition, envy_violations};
use crate::core::phase::{Phase, PhaseState, Roles};
use crate::core::round::{CoreOutcome, run_core};
use crate::core::types::{AGENT_COUNT, AgentId, Region};
use crate::core::valuation::Agents;
use crate::io::config::ProtocolConfig;

/// Number of Phase One rounds.
const PHASE_ONE_ROUNDS: u32 = 4;
/// Number of Phase Two rounds.
const PHASE_TWO_ROUNDS: u32 = 2;
/// The agent that cuts throughout Phase One.
const FIRST_CUTTER: AgentId = 0;

/// One committed CORE round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRecord {
    pub phase: Phase,
    /// Agents that sat the round out.
    pub excluded: Vec<AgentId>,
    pub outcome: CoreOutcome,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolReport {
    pub agents: Vec<String>,
    pub allocation: Allocation,
    pub rounds: Vec<RoundRecord>,
    pub corrections: Vec<Transfer>,
    pub division: Option<Division>,
    /// `values[i][j]` is agent `i`'s value of agent `j`'s share.
    pub values: Vec<Vec<f64>>,
}

/// Divide the whole cake among exactly four agents without envy.
pub fn run_protocol(
    agents: &Agents,
    config: &ProtocolConfig,
) -> Result<ProtocolReport, ProtocolError> {
    let length = validate_agents(agents, config.tolerance)?;
    let mut run = Run::new(agents, config, length);
    info!(length, "protocol started");
    run.drive()?;
    run.finish()
}

/// Check for four agents that share one positive cake length.
fn validate_agents(agents: &Agents, tolerance: f64) -> Result<f64, ProtocolError> {
    if agents.len() != AGENT_COUNT {
        return Err(ProtocolError::InvalidAgents(format!(
            "expected {} agents, got {}",
            AGENT_COUNT,
            agents.len()
        )));
    }
    let length = agents[0].cake_length();
    if !length.is_finite() || length <= 0.0 {
        return Err(ProtocolError::InvalidAgents(format!(
            "{} reports cake length {}",
            agents[0].name(),
            length
        )));
    }
    if let Some(agent) = agents
        .iter()
        .find(|agent| (agent.cake_length() - length).abs() > tolerance)
    {
        return Err(ProtocolError::InvalidAgents(format!(
            "{} reports cake length {} but {} reports {}",
            agent.name(),
            agent.cake_length(),
            agents[0].name(),
            length
        )));
    }
    Ok(length)
}

struct Run<'a> {
    agents: &'a Agents,
    config: &'a ProtocolConfig,
    cake: Region,
    allocation: Allocation,
    residue: Region,
    state: PhaseState,
    rounds: Vec<RoundRecord>,
    corrections: Vec<Transfer>,
    division: Option<Division>,
}

impl<'a> Run<'a> {
    fn new(agents: &'a Agents, config: &'a ProtocolConfig, length: f64) -> Self {
        Self {
            agents,
            config,
            cake: Region::whole(length),
            allocation: Allocation::empty(agents.len()),
            residue: Region::whole(length),
            state: PhaseState::new(),
            rounds: Vec::new(),
            corrections: Vec::new(),
            division: None,
        }
    }

    fn drive(&mut self) -> Result<(), ProtocolError> {
        for round in 0..PHASE_ONE_ROUNDS {
            self.state.phase = Phase::PhaseOne(round);
            let outcome = self.commit_round(FIRST_CUTTER, &[])?;
            self.state
                .phase_one_untrimmed
                .push(outcome.untrimmed_recipients());
            if self.try_finish()? {
                return Ok(());
            }
        }

        if let Some(favored) = self.state.persistent_untrimmed()
            && !self.matrix().dominates(FIRST_CUTTER, favored)
        {
            info!(agent = favored, "same competitor served whole in every phase one round");
            let candidates = self.phase_one_candidates(favored);
            self.apply_correction(FIRST_CUTTER, favored, &candidates)?;
            if self.try_finish()? {
                return Ok(());
            }
        }

        self.state.phase = Phase::DominationCheck;
        self.commit_round(FIRST_CUTTER, &[])?;
        if self.try_finish()? {
            return Ok(());
        }
        let matrix = self.matrix();
        if let Some(undominated) =
            (0..AGENT_COUNT).find(|agent| *agent != FIRST_CUTTER && !matrix.dominates(FIRST_CUTTER, *agent))
        {
            info!(cutter = undominated, "agent not dominated by the first cutter cuts next");
            self.commit_round(undominated, &[FIRST_CUTTER])?;
            if self.try_finish()? {
                return Ok(());
            }
        }

        let roles = Roles::assign(&self.matrix());
        self.state.roles = Some(roles);
        info!(a = roles.a, b = roles.b, c = roles.c, d = roles.d, "phase two roles");
        let first_phase_two = self.rounds.len();
        for round in 0..PHASE_TWO_ROUNDS {
            self.state.phase = Phase::PhaseTwo(round);
            let matrix = self.matrix();
            let excluded: Vec<AgentId> = [roles.b, roles.c]
                .into_iter()
                .find(|candidate| {
                    [roles.a, roles.b, roles.c]
                        .iter()
                        .filter(|other| *other != candidate)
                        .all(|other| matrix.dominates(*candidate, *other))
                })
                .into_iter()
                .collect();
            self.commit_round(roles.d, &excluded)?;
            if self.try_finish()? {
                return Ok(());
            }
        }
        self.phase_two_correction(first_phase_two)?;
        if self.try_finish()? {
            return Ok(());
        }

        for round in 0..self.config.settle_rounds {
            self.state.phase = Phase::Settle(round);
            let cutter = (self.state.last_cutter + 1) % AGENT_COUNT;
            self.commit_round(cutter, &[])?;
            if self.try_finish()? {
                return Ok(());
            }
        }
        Err(ProtocolError::UnsatisfiableCorrection(format!(
            "residue {} still contested after {} settle rounds",
            self.residue, self.config.settle_rounds
        )))
    }

    fn matrix(&self) -> DominationMatrix {
        DominationMatrix::compute(
            self.agents,
            &self.allocation,
            &self.residue,
            self.config.tolerance,
        )
    }

    /// Run and commit one CORE round, dropping exclusions that would leave an
    /// excluded agent envious.
    fn commit_round(
        &mut self,
        cutter: AgentId,
        excluded: &[AgentId],
    ) -> Result<CoreOutcome, ProtocolError> {
        let tolerance = self.config.tolerance;
        let mut excluded = excluded.to_vec();
        let outcome = if excluded.is_empty() {
            run_core(self.agents, cutter, &self.residue, &[], tolerance)?
        } else {
            match run_core(self.agents, cutter, &self.residue, &excluded, tolerance) {
                Ok(outcome) if envy_violations(self.agents, &self.granted(&outcome), tolerance).is_empty() => {
                    outcome
                }
                Ok(_) | Err(ProtocolError::MarkingAmbiguity(_)) => {
                    warn!(cutter, ?excluded, "exclusion would break envy-freeness, replaying round");
                    excluded.clear();
                    run_core(self.agents, cutter, &self.residue, &[], tolerance)?
                }
                Err(err) => return Err(err),
            }
        };

        self.allocation = self.granted(&outcome);
        self.residue = outcome.residue.clone();
        self.state.last_cutter = cutter;
        debug!(
            phase = %self.state.phase,
            cutter,
            mode = ?outcome.mode,
            residue = %self.residue,
            "round committed"
        );
        self.rounds.push(RoundRecord {
            phase: self.state.phase,
            excluded,
            outcome: outcome.clone(),
        });
        self.verify()?;
        Ok(outcome)
    }

    /// The allocation after granting every piece of `outcome`.
    fn granted(&self, outcome: &CoreOutcome) -> Allocation {
        let mut allocation = self.allocation.clone();
        for award in &outcome.awards {
            allocation.grant(award.agent, &award.region);
        }
        allocation.grant(outcome.cutter, &outcome.insignificant);
        allocation
    }

    /// `favored`'s Phase One pieces, weakest round advantage first.
    fn phase_one_candidates(&self, favored: AgentId) -> Vec<Region> {
        let valuation = self.agents[favored].as_ref();
        let mut scored: Vec<(f64, Region)> = self
            .rounds
            .iter()
            .filter(|record| matches!(record.phase, Phase::PhaseOne(_)))
            .filter_map(|record| {
                let own = record.outcome.award_for(favored)?;
                let own_value = own.region.value(valuation);
                let best_other = record
                    .outcome
                    .awards
                    .iter()
                    .filter(|award| award.agent != favored)
                    .map(|award| award.region.value(valuation))
                    .chain(std::iter::once(record.outcome.insignificant.value(valuation)))
                    .fold(f64::NEG_INFINITY, f64::max);
                Some((own_value - best_other, own.region.clone()))
            })
            .collect();
        scored.sort_by(|left, right| left.0.total_cmp(&right.0));
        scored.into_iter().map(|(_, region)| region).collect()
    }

    /// Correct the Phase Two recipient that the extreme agents fail to dominate.
    fn phase_two_correction(&mut self, first_round: usize) -> Result<(), ProtocolError> {
        let Some(roles) = self.state.roles else {
            return Ok(());
        };
        let phase_two = self.rounds.get(first_round..).unwrap_or_default();
        let matrix = self.matrix();
        let served_whole = |agent: AgentId| {
            !phase_two.is_empty()
                && phase_two
                    .iter()
                    .all(|record| record.outcome.untrimmed_recipients().contains(&agent))
        };
        let Some(middle) = [roles.b, roles.c]
            .into_iter()
            .find(|agent| served_whole(*agent))
            .or_else(|| {
                [roles.b, roles.c].into_iter().find(|agent| {
                    !(matrix.dominates(roles.a, *agent) && matrix.dominates(roles.d, *agent))
                })
            })
        else {
            return Ok(());
        };
        let Some(beneficiary) = [roles.a, roles.d]
            .into_iter()
            .find(|agent| *agent != middle && !matrix.dominates(*agent, middle))
        else {
            return Ok(());
        };
        let candidates: Vec<Region> = phase_two
            .iter()
            .filter_map(|record| record.outcome.award_for(middle))
            .map(|award| award.region.clone())
            .collect();
        info!(beneficiary, donor = middle, "phase two correction");
        self.apply_correction(beneficiary, middle, &candidates)
    }

    /// Apply a correction, or leave the allocation as is when no candidate
    /// transfer keeps it envy-free. Later CORE rounds keep shrinking the
    /// residue either way.
    fn apply_correction(
        &mut self,
        beneficiary: AgentId,
        donor: AgentId,
        candidates: &[Region],
    ) -> Result<(), ProtocolError> {
        let corrected = correct(
            self.agents,
            &self.allocation,
            &self.residue,
            beneficiary,
            donor,
            candidates,
            self.config.tolerance,
        );
        let (allocation, transfer) = match corrected {
            Ok(corrected) => corrected,
            Err(ProtocolError::UnsatisfiableCorrection(reason)) => {
                warn!(beneficiary, donor, %reason, "correction skipped, continuing with core rounds");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        self.allocation = allocation;
        if let Some(transfer) = transfer {
            self.corrections.push(transfer);
        }
        self.verify()
    }

    /// Finish the run if the residue is gone or can be divided safely.
    fn try_finish(&mut self) -> Result<bool, ProtocolError> {
        if self.residue.is_empty() {
            self.state.phase = Phase::Done;
            return Ok(true);
        }
        let tolerance = self.config.tolerance;
        let division = if self
            .agents
            .iter()
            .all(|agent| self.residue.value(agent.as_ref()) <= tolerance)
        {
            Division::Negligible {
                receiver: self.state.last_cutter,
            }
        } else {
            match terminal_division(&self.matrix()) {
                Some(division) => division,
                None => return Ok(false),
            }
        };

        self.state.phase = Phase::FinalDivision;
        info!(division = ?division, residue = %self.residue, "terminal division");
        let grants: Grants = match division {
            Division::Negligible { receiver } | Division::Whole { receiver } => {
                vec![(receiver, self.residue.clone())]
            }
            Division::CutAndChoose { cutter, chooser } => {
                cut_and_choose(self.agents, &self.residue, cutter, chooser, tolerance)?
            }
            Division::SelfridgeConway { receivers } => {
                selfridge_conway(self.agents, &self.residue, receivers, tolerance)?
            }
        };
        for (agent, region) in &grants {
            self.allocation.grant(*agent, region);
        }
        self.residue = Region::empty();
        self.division = Some(division);
        self.verify()?;
        self.state.phase = Phase::Done;
        Ok(true)
    }

    fn verify(&self) -> Result<(), ProtocolError> {
        if !self.config.verify {
            return Ok(());
        }
        self.check()
    }

    fn check(&self) -> Result<(), ProtocolError> {
        let mut errors = check_partition(&self.cake, &self.allocation, &self.residue);
        errors.extend(envy_violations(
            self.agents,
            &self.allocation,
            self.config.tolerance,
        ));
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::InvariantViolation(format!(
                "after {}: {}",
                self.state.phase,
                errors.join("; ")
            )))
        }
    }

    fn finish(self) -> Result<ProtocolReport, ProtocolError> {
        self.check()?;
        info!(rounds = self.rounds.len(), corrections = self.corrections.len(), "protocol finished");
        Ok(ProtocolReport {
            agents: self.agents.iter().map(|agent| agent.name().to_string()).collect(),
            values: self.allocation.value_matrix(self.agents),
            allocation: self.allocation,
            rounds: self.rounds,
            corrections: self.corrections,
            division: self.division,
        })
    }
}
