//! One CORE round: cut a residue into four, then award pieces competitively.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::core::error::ProtocolError;
use crate::core::invariants::local_envy_violations;
use crate::core::marks::{Mark, MarkRank, place_marks, ranking, resolve_rightmost};
use crate::core::slicer::slice_into_four;
use crate::core::types::{AgentId, Piece, Region};
use crate::core::valuation::Agents;

/// How the competitors of a round are served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionMode {
    /// Uncontested favorites are awarded whole before anyone marks.
    Immediate,
    /// Every competitor marks.
    FullCompetition,
}

/// A piece (or the partial region of a piece) handed to a competitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Award {
    pub agent: AgentId,
    pub piece: usize,
    pub region: Region,
    pub trimmed: bool,
}

/// Result of one CORE round.
///
/// `insignificant` is the cutter's piece; `residue` holds the untaken whole
/// pieces and every trimming. Nothing here is committed until the caller
/// applies it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoreOutcome {
    pub cutter: AgentId,
    pub pieces: Vec<Piece>,
    pub awards: Vec<Award>,
    pub insignificant: Region,
    pub residue: Region,
    pub marks: Vec<Mark>,
    pub mode: CompetitionMode,
}

impl CoreOutcome {
    /// Everything the competitors left behind, the cutter's piece included.
    pub fn new_residue(&self) -> Region {
        self.insignificant.union(&self.residue)
    }

    pub fn award_for(&self, agent: AgentId) -> Option<&Award> {
        self.awards.iter().find(|award| award.agent == agent)
    }

    /// Competitors that received a whole, untrimmed piece.
    pub fn untrimmed_recipients(&self) -> Vec<AgentId> {
        self.awards
            .iter()
            .filter(|award| !award.trimmed)
            .map(|award| award.agent)
            .collect()
    }

    fn holdings(&self) -> Vec<(AgentId, &Region)> {
        let mut holdings: Vec<(AgentId, &Region)> = self
            .awards
            .iter()
            .map(|award| (award.agent, &award.region))
            .collect();
        holdings.push((self.cutter, &self.insignificant));
        holdings
    }
}

/// Run one CORE round among every agent except `cutter` and `excluded`.
///
/// Tries the immediate mode first and full competition second; within a mode
/// the rule-derived mark kinds are tried before every other kind assignment.
/// The first assignment that leaves the round locally envy-free wins.
pub fn run_core(
    agents: &Agents,
    cutter: AgentId,
    residue: &Region,
    excluded: &[AgentId],
    tolerance: f64,
) -> Result<CoreOutcome, ProtocolError> {
    let pieces = slice_into_four(residue, agents[cutter].as_ref())?;
    let competitors: Vec<AgentId> = (0..agents.len())
        .filter(|agent| *agent != cutter && !excluded.contains(agent))
        .collect();
    let rankings: BTreeMap<AgentId, Vec<usize>> = competitors
        .iter()
        .map(|&agent| (agent, ranking(&pieces, agents[agent].as_ref(), tolerance)))
        .collect();
    let favorites: BTreeMap<AgentId, usize> = rankings
        .iter()
        .map(|(agent, order)| (*agent, order[0]))
        .collect();

    let contested: Vec<AgentId> = competitors
        .iter()
        .copied()
        .filter(|agent| {
            competitors
                .iter()
                .any(|other| other != agent && favorites[other] == favorites[agent])
        })
        .collect();

    let mut modes = vec![CompetitionMode::Immediate];
    if !contested.is_empty() && contested.len() < competitors.len() {
        modes.push(CompetitionMode::FullCompetition);
    }

    for mode in modes {
        let markers = match mode {
            CompetitionMode::Immediate => contested.clone(),
            CompetitionMode::FullCompetition => competitors.clone(),
        };
        let preferred = rule_kinds(&competitors, &markers, &rankings);
        for kinds in kind_assignments(&preferred) {
            let attempt = Attempt {
                agents,
                cutter,
                pieces: &pieces,
                competitors: &competitors,
                markers: &markers,
                rankings: &rankings,
                tolerance,
            };
            if let Some(outcome) = attempt.run(mode, &kinds)? {
                debug!(
                    cutter,
                    mode = ?mode,
                    kinds = ?kinds,
                    awards = outcome.awards.len(),
                    "core round resolved"
                );
                return Ok(outcome);
            }
            debug!(cutter, mode = ?mode, kinds = ?kinds, "mark assignment rejected");
        }
    }

    Err(ProtocolError::MarkingAmbiguity(format!(
        "no mark assignment for competitors {:?} of cutter {} is locally envy-free",
        contested, cutter
    )))
}

/// Mark kinds from the marking rule.
///
/// A marker places a 2-mark when nobody else competes for its second
/// favorite, or when exactly one contested agent does, ranks that piece
/// second too, and each of the two shares its favorite with exactly one
/// rival. Everyone else places a 3-mark.
fn rule_kinds(
    competitors: &[AgentId],
    markers: &[AgentId],
    rankings: &BTreeMap<AgentId, Vec<usize>>,
) -> Vec<MarkRank> {
    let favorite = |agent: AgentId| rankings[&agent][0];
    let second = |agent: AgentId| rankings[&agent].get(1).copied();
    let favorite_rivals = |agent: AgentId| {
        competitors
            .iter()
            .filter(|other| **other != agent && favorite(**other) == favorite(agent))
            .count()
    };

    markers
        .iter()
        .map(|&agent| {
            let Some(target) = second(agent) else {
                return MarkRank::ThreeMark;
            };
            let rivals: Vec<AgentId> = competitors
                .iter()
                .copied()
                .filter(|other| {
                    *other != agent
                        && (favorite(*other) == target
                            || (markers.contains(other) && second(*other) == Some(target)))
                })
                .collect();
            match rivals.as_slice() {
                [] => MarkRank::TwoMark,
                [rival]
                    if markers.contains(rival)
                        && second(*rival) == Some(target)
                        && favorite_rivals(agent) == 1
                        && favorite_rivals(*rival) == 1 =>
                {
                    MarkRank::TwoMark
                }
                _ => MarkRank::ThreeMark,
            }
        })
        .collect()
}

/// `preferred` first, then every other assignment in lexicographic order.
fn kind_assignments(preferred: &[MarkRank]) -> Vec<Vec<MarkRank>> {
    let count = preferred.len();
    let mut assignments = vec![preferred.to_vec()];
    for mask in 0..(1usize << count) {
        let kinds: Vec<MarkRank> = (0..count)
            .map(|slot| {
                if mask & (1 << (count - 1 - slot)) == 0 {
                    MarkRank::TwoMark
                } else {
                    MarkRank::ThreeMark
                }
            })
            .collect();
        if kinds != preferred {
            assignments.push(kinds);
        }
    }
    assignments
}

struct Attempt<'a> {
    agents: &'a Agents,
    cutter: AgentId,
    pieces: &'a [Piece],
    competitors: &'a [AgentId],
    markers: &'a [AgentId],
    rankings: &'a BTreeMap<AgentId, Vec<usize>>,
    tolerance: f64,
}

impl Attempt<'_> {
    /// Build the round for one kind assignment; `None` when it fails.
    fn run(
        &self,
        mode: CompetitionMode,
        kinds: &[MarkRank],
    ) -> Result<Option<CoreOutcome>, ProtocolError> {
        let mut awards: Vec<Award> = Vec::new();
        let mut marks: Vec<Mark> = Vec::new();
        let mut taken = vec![false; self.pieces.len()];

        for &agent in self.competitors {
            if self.markers.contains(&agent) {
                continue;
            }
            let piece = self.rankings[&agent][0];
            let region = self.pieces[piece].clone();
            marks.push(Mark {
                agent,
                piece,
                position: region.start().unwrap_or(0.0),
                rank: MarkRank::Favorite,
            });
            awards.push(Award {
                agent,
                piece,
                region,
                trimmed: false,
            });
            taken[piece] = true;
        }

        let available: Vec<usize> = (0..self.pieces.len()).filter(|index| !taken[*index]).collect();
        for (&agent, &kind) in self.markers.iter().zip(kinds) {
            marks.extend(place_marks(
                self.pieces,
                &available,
                agent,
                self.agents[agent].as_ref(),
                &self.rankings[&agent],
                kind,
                self.tolerance,
            )?);
        }

        let mut residue = Region::empty();
        for claim in resolve_rightmost(self.pieces, &marks, self.agents, self.tolerance) {
            residue = residue.union(&self.pieces[claim.piece].subtract(&claim.region));
            taken[claim.piece] = true;
            awards.push(Award {
                agent: claim.holder,
                piece: claim.piece,
                region: claim.region,
                trimmed: claim.trimmed,
            });
        }

        for &agent in self.markers {
            if awards.iter().any(|award| award.agent == agent) {
                continue;
            }
            let Some(&piece) = self.rankings[&agent].iter().find(|index| !taken[**index]) else {
                return Ok(None);
            };
            taken[piece] = true;
            awards.push(Award {
                agent,
                piece,
                region: self.pieces[piece].clone(),
                trimmed: false,
            });
        }

        let Some(insignificant) = (0..self.pieces.len()).find(|index| !taken[*index]) else {
            return Ok(None);
        };
        taken[insignificant] = true;
        for (index, piece) in self.pieces.iter().enumerate() {
            if !taken[index] {
                residue = residue.union(piece);
            }
        }
        awards.sort_by_key(|award| award.agent);

        let outcome = CoreOutcome {
            cutter: self.cutter,
            pieces: self.pieces.to_vec(),
            awards,
            insignificant: self.pieces[insignificant].clone(),
            residue,
            marks,
            mode,
        };
        if local_envy_violations(self.agents, &outcome.holdings(), self.tolerance).is_empty() {
            Ok(Some(outcome))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{agents, region};

    const TOL: f64 = 1e-9;

    #[test]
    fn distinct_favorites_are_awarded_whole() {
        let agents = agents(&[
            &[1.0, 1.0, 1.0, 1.0],
            &[3.0, 4.0, 2.0, 1.0],
            &[2.0, 3.0, 4.0, 1.0],
            &[1.0, 2.0, 3.0, 4.0],
        ]);
        let outcome = run_core(&agents, 0, &Region::whole(4.0), &[], TOL).expect("core");
        assert_eq!(outcome.mode, CompetitionMode::Immediate);
        let regions: Vec<(AgentId, Region)> = outcome
            .awards
            .iter()
            .map(|award| (award.agent, award.region.clone()))
            .collect();
        assert_eq!(
            regions,
            vec![
                (1, Region::single(1.0, 2.0)),
                (2, Region::single(2.0, 3.0)),
                (3, Region::single(3.0, 4.0)),
            ]
        );
        assert_eq!(outcome.insignificant, Region::single(0.0, 1.0));
        assert!(outcome.residue.is_empty());
        assert_eq!(outcome.new_residue(), Region::single(0.0, 1.0));
        assert_eq!(outcome.untrimmed_recipients(), vec![1, 2, 3]);
        assert!(outcome.marks.iter().all(|mark| mark.rank == MarkRank::Favorite));
    }

    #[test]
    fn contested_favorites_fall_back_to_full_competition() {
        let agents = agents(&[
            &[1.0, 1.0, 1.0, 1.0],
            &[4.0, 1.0, 1.0, 1.0],
            &[3.0, 1.0, 1.0, 2.0],
            &[1.0, 1.0, 1.0, 4.0],
        ]);
        let outcome = run_core(&agents, 0, &Region::whole(4.0), &[], TOL).expect("core");
        assert_eq!(outcome.mode, CompetitionMode::FullCompetition);

        let first = outcome.award_for(1).expect("agent 1");
        assert!(first.trimmed);
        assert_eq!(first.piece, 0);
        assert!((first.region.start().expect("start") - 2.0 / 3.0).abs() < TOL);
        let second = outcome.award_for(2).expect("agent 2");
        assert_eq!(second.region, Region::single(1.0, 2.0));
        assert!(!second.trimmed);
        let third = outcome.award_for(3).expect("agent 3");
        assert_eq!(third.region, Region::single(3.5, 4.0));

        assert_eq!(outcome.insignificant, Region::single(2.0, 3.0));
        assert_eq!(outcome.residue.segments().len(), 2);
        assert!((outcome.residue.length() - (2.0 / 3.0 + 0.5)).abs() < TOL);
        assert_eq!(outcome.untrimmed_recipients(), vec![2]);
    }

    #[test]
    fn round_is_locally_envy_free() {
        let agents = agents(&[
            &[1.0, 1.0, 1.0, 1.0],
            &[4.0, 1.0, 1.0, 1.0],
            &[3.0, 1.0, 1.0, 2.0],
            &[1.0, 1.0, 1.0, 4.0],
        ]);
        let outcome = run_core(&agents, 0, &Region::whole(4.0), &[], TOL).expect("core");
        assert!(local_envy_violations(&agents, &outcome.holdings(), TOL).is_empty());
    }

    #[test]
    fn excluded_agents_receive_nothing() {
        let agents = agents(&[
            &[1.0, 1.0, 1.0, 1.0],
            &[3.0, 4.0, 2.0, 1.0],
            &[2.0, 3.0, 4.0, 1.0],
            &[1.0, 2.0, 3.0, 4.0],
        ]);
        let outcome = run_core(&agents, 0, &Region::whole(4.0), &[3], TOL).expect("core");
        assert!(outcome.award_for(3).is_none());
        assert_eq!(outcome.insignificant, Region::single(0.0, 1.0));
        assert_eq!(outcome.residue, Region::single(3.0, 4.0));
    }

    #[test]
    fn fragmented_residue_is_cut_across_segments() {
        let agents = agents(&[
            &[1.0, 1.0, 1.0, 1.0],
            &[4.0, 1.0, 1.0, 1.0],
            &[3.0, 1.0, 1.0, 2.0],
            &[1.0, 1.0, 1.0, 4.0],
        ]);
        let residue = region(&[(0.0, 2.0 / 3.0), (3.0, 3.5)]);
        let outcome = run_core(&agents, 0, &residue, &[], TOL).expect("core");
        assert_eq!(outcome.award_for(3).expect("agent 3").piece, 3);
        assert_eq!(outcome.award_for(1).expect("agent 1").piece, 0);
        assert_eq!(outcome.award_for(2).expect("agent 2").piece, 1);
        assert_eq!(outcome.insignificant.segments().len(), 2);
        assert!(outcome.residue.is_empty());
    }

    #[test]
    fn repeated_rounds_are_identical() {
        let agents = agents(&[
            &[2.0, 1.0, 3.0, 1.0],
            &[4.0, 1.0, 1.0, 1.0],
            &[3.0, 1.0, 1.0, 2.0],
            &[1.0, 1.0, 1.0, 4.0],
        ]);
        let first = run_core(&agents, 0, &Region::whole(4.0), &[], TOL);
        let second = run_core(&agents, 0, &Region::whole(4.0), &[], TOL);
        assert_eq!(first, second);
    }

    #[test]
    fn kind_assignments_start_with_preferred_and_skip_duplicates() {
        let preferred = vec![MarkRank::ThreeMark, MarkRank::TwoMark];
        let assignments = kind_assignments(&preferred);
        assert_eq!(assignments.len(), 4);
        assert_eq!(assignments[0], preferred);
        assert_eq!(assignments[1], vec![MarkRank::TwoMark, MarkRank::TwoMark]);
    }
}
