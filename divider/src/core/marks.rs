//! Preference rankings, trim marks, and the rightmost-mark rule.

use serde::Serialize;

use crate::core::error::ProtocolError;
use crate::core::slicer::mark_within;
use crate::core::types::{AgentId, Piece, Region};
use crate::core::valuation::{Agents, Valuation};

/// What a mark stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkRank {
    /// Uncontested favorite awarded whole; recorded at the piece start.
    Favorite,
    /// Favorite trimmed down to the second favorite's value.
    TwoMark,
    /// Top two pieces trimmed down to the third favorite's value.
    ThreeMark,
}

impl MarkRank {
    /// Which favorite (1-based) sets the trim target.
    fn target_rank(self) -> usize {
        match self {
            Self::Favorite => 1,
            Self::TwoMark => 2,
            Self::ThreeMark => 3,
        }
    }
}

/// A position placed by one agent inside one piece of a CORE round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mark {
    pub agent: AgentId,
    pub piece: usize,
    pub position: f64,
    pub rank: MarkRank,
}

/// Piece indices ordered from most to least preferred by `agent`.
///
/// A piece overtakes the current best only when it is worth more by more
/// than `tolerance`; otherwise the lower index wins.
pub fn ranking(pieces: &[Piece], agent: &dyn Valuation, tolerance: f64) -> Vec<usize> {
    let values: Vec<f64> = pieces.iter().map(|piece| piece.value(agent)).collect();
    let mut remaining: Vec<usize> = (0..pieces.len()).collect();
    let mut order = Vec::with_capacity(pieces.len());
    while !remaining.is_empty() {
        let mut best = 0;
        for slot in 1..remaining.len() {
            if values[remaining[slot]] > values[remaining[best]] + tolerance {
                best = slot;
            }
        }
        order.push(remaining.remove(best));
    }
    order
}

/// Index of `agent`'s favorite piece.
pub fn favorite_piece(pieces: &[Piece], agent: &dyn Valuation, tolerance: f64) -> usize {
    ranking(pieces, agent, tolerance).first().copied().unwrap_or(0)
}

/// Position `m` inside `piece` such that `piece ∩ [m, end)` is worth `target`.
///
/// Pieces worth no more than `target` are marked at their start.
pub fn trim_point(
    piece: &Piece,
    agent: &dyn Valuation,
    target: f64,
    tolerance: f64,
) -> Result<f64, ProtocolError> {
    let Some(start) = piece.start() else {
        return Err(ProtocolError::DegenerateInput(format!(
            "{} cannot mark an empty piece",
            agent.name()
        )));
    };
    let total = piece.value(agent);
    if total <= target + tolerance {
        return Ok(start);
    }
    mark_within(piece, agent, total - target)
}

/// Place `agent`'s marks of the given rank on the `available` pieces.
///
/// The target is the value of the agent's k-th favorite among all pieces of
/// the round; the marked pieces are its top k-1 among those still available.
pub fn place_marks(
    pieces: &[Piece],
    available: &[usize],
    agent: AgentId,
    valuation: &dyn Valuation,
    order: &[usize],
    rank: MarkRank,
    tolerance: f64,
) -> Result<Vec<Mark>, ProtocolError> {
    let Some(&target_piece) = order.get(rank.target_rank() - 1) else {
        return Ok(Vec::new());
    };
    let target = pieces[target_piece].value(valuation);
    order
        .iter()
        .filter(|index| available.contains(index))
        .take(rank.target_rank() - 1)
        .map(|&piece| {
            Ok(Mark {
                agent,
                piece,
                position: trim_point(&pieces[piece], valuation, target, tolerance)?,
                rank,
            })
        })
        .collect()
}

/// A partial region settled by the rightmost-mark rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialClaim {
    pub piece: usize,
    pub holder: AgentId,
    pub region: Region,
    pub trimmed: bool,
}

struct Contest {
    piece: usize,
    order: Vec<AgentId>,
    next: usize,
    region: Region,
    trimmed: bool,
}

impl Contest {
    fn holder(&self) -> Option<AgentId> {
        self.order.get(self.next).copied()
    }
}

/// Settle every marked piece by the rightmost-mark rule.
///
/// Each piece's partial region runs from its second-rightmost mark (its start
/// when marked once) to its end, and goes to the rightmost marker. An agent
/// holding two partials keeps the one it values more (tie: lower piece) and
/// the declined piece falls to its next marker. Pieces every marker declined
/// are left out of the result.
pub fn resolve_rightmost(
    pieces: &[Piece],
    marks: &[Mark],
    agents: &Agents,
    tolerance: f64,
) -> Vec<PartialClaim> {
    let mut contests: Vec<Contest> = Vec::new();
    for (index, piece) in pieces.iter().enumerate() {
        let mut placed: Vec<&Mark> = marks
            .iter()
            .filter(|mark| mark.piece == index && mark.rank != MarkRank::Favorite)
            .collect();
        let Some(piece_start) = piece.start() else {
            continue;
        };
        if placed.is_empty() {
            continue;
        }
        placed.sort_by(|left, right| {
            right
                .position
                .total_cmp(&left.position)
                .then(left.agent.cmp(&right.agent))
        });
        let cut = placed.get(1).map_or(piece_start, |mark| mark.position);
        contests.push(Contest {
            piece: index,
            order: placed.iter().map(|mark| mark.agent).collect(),
            next: 0,
            region: piece.split_at(cut).1,
            trimmed: cut > piece_start,
        });
    }

    loop {
        let conflict = (0..agents.len()).find_map(|agent| {
            let held: Vec<usize> = contests
                .iter()
                .enumerate()
                .filter(|(_, contest)| contest.holder() == Some(agent))
                .map(|(slot, _)| slot)
                .collect();
            (held.len() > 1).then_some((agent, held))
        });
        let Some((agent, held)) = conflict else {
            break;
        };
        let valuation = agents[agent].as_ref();
        let mut keep = held[0];
        let mut keep_value = contests[keep].region.value(valuation);
        for &slot in &held[1..] {
            let value = contests[slot].region.value(valuation);
            if value > keep_value + tolerance {
                keep = slot;
                keep_value = value;
            }
        }
        for slot in held {
            if slot != keep {
                contests[slot].next += 1;
            }
        }
    }

    contests
        .into_iter()
        .filter_map(|contest| {
            contest.holder().map(|holder| PartialClaim {
                piece: contest.piece,
                holder,
                region: contest.region,
                trimmed: contest.trimmed,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{agents, piecewise};

    const TOL: f64 = 1e-9;

    fn quarters() -> Vec<Piece> {
        (0..4)
            .map(|index| Region::single(index as f64, index as f64 + 1.0))
            .collect()
    }

    #[test]
    fn ranking_breaks_ties_by_lower_index() {
        let agent = piecewise("b", &[3.0, 1.0, 1.0, 3.0]);
        assert_eq!(ranking(&quarters(), &agent, TOL), vec![0, 3, 1, 2]);
    }

    #[test]
    fn favorite_is_stable_across_queries() {
        let agent = piecewise("b", &[3.0, 4.0, 2.0, 1.0]);
        let first = favorite_piece(&quarters(), &agent, TOL);
        let second = favorite_piece(&quarters(), &agent, TOL);
        assert_eq!(first, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn trim_point_keeps_target_on_the_right() {
        let agent = piecewise("b", &[4.0, 1.0, 1.0, 1.0]);
        let piece = Region::single(0.0, 1.0);
        let position = trim_point(&piece, &agent, 1.0, TOL).expect("trim");
        assert!((position - 0.75).abs() < TOL);
        let untouched = trim_point(&Region::single(1.0, 2.0), &agent, 1.0, TOL).expect("trim");
        assert_eq!(untouched, 1.0);
    }

    #[test]
    fn three_mark_trims_top_two_available_pieces() {
        let agent = piecewise("c", &[3.0, 1.0, 1.0, 2.0]);
        let pieces = quarters();
        let order = ranking(&pieces, &agent, TOL);
        let marks = place_marks(&pieces, &[0, 1, 2, 3], 2, &agent, &order, MarkRank::ThreeMark, TOL)
            .expect("marks");
        let positions: Vec<(usize, f64)> = marks.iter().map(|mark| (mark.piece, mark.position)).collect();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].0, 0);
        assert!((positions[0].1 - 2.0 / 3.0).abs() < TOL);
        assert_eq!(positions[1], (3, 3.5));
    }

    #[test]
    fn rightmost_marker_takes_partial_from_second_mark() {
        let agents = agents(&[
            &[1.0, 1.0, 1.0, 1.0],
            &[4.0, 1.0, 1.0, 1.0],
            &[3.0, 1.0, 1.0, 2.0],
        ]);
        let marks = vec![
            Mark { agent: 1, piece: 0, position: 0.75, rank: MarkRank::TwoMark },
            Mark { agent: 2, piece: 0, position: 0.5, rank: MarkRank::TwoMark },
        ];
        let claims = resolve_rightmost(&quarters(), &marks, &agents, TOL);
        assert_eq!(
            claims,
            vec![PartialClaim {
                piece: 0,
                holder: 1,
                region: Region::single(0.5, 1.0),
                trimmed: true,
            }]
        );
    }

    #[test]
    fn double_holder_keeps_preferred_partial_and_passes_the_other() {
        let agents = agents(&[
            &[1.0, 1.0, 1.0, 1.0],
            &[4.0, 2.0, 1.0, 1.0],
            &[3.0, 3.0, 1.0, 1.0],
        ]);
        let marks = vec![
            Mark { agent: 1, piece: 0, position: 0.9, rank: MarkRank::ThreeMark },
            Mark { agent: 1, piece: 1, position: 1.8, rank: MarkRank::ThreeMark },
            Mark { agent: 2, piece: 0, position: 0.4, rank: MarkRank::ThreeMark },
            Mark { agent: 2, piece: 1, position: 1.5, rank: MarkRank::ThreeMark },
        ];
        let claims = resolve_rightmost(&quarters(), &marks, &agents, TOL);
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].holder, 1);
        assert_eq!(claims[0].region, Region::single(0.4, 1.0));
        assert_eq!(claims[1].holder, 2);
        assert_eq!(claims[1].region, Region::single(1.5, 2.0));
    }
}
