//! Single-elimination bracket math.
//!
//! Match `m` of round `r` feeds match `ceil(m / 2)` of round `r + 1`: odd
//! match numbers fill the `team1` slot and even ones fill `team2`.

use crate::api_error::ApiError;
use crate::models::match_model::{BracketMatch, MatchStatus, Slot};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

/// Largest field a single-elimination bracket is built for.
pub const MAX_BRACKET_TEAMS: usize = 1024;

#[derive(Debug, Error, PartialEq)]
pub enum BracketError {
    #[error("A bracket needs at least 2 teams, got {0}")]
    TooFewTeams(usize),

    #[error("A bracket holds at most {max} teams, got {actual}")]
    TooManyTeams { max: usize, actual: usize },

    #[error("Team {0} is seeded more than once")]
    DuplicateTeam(Uuid),
}

impl From<BracketError> for ApiError {
    fn from(e: BracketError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BracketStructure {
    pub team_count: usize,
    pub total_rounds: u32,
    pub is_power_of_two: bool,
    pub bracket_size: usize,
    pub byes: usize,
    /// Index 0 is round 1.
    pub matches_per_round: Vec<usize>,
    /// Every match record of the bracket, bye matches included.
    pub total_matches: usize,
    /// Matches that are actually played.
    pub playable_matches: usize,
}

impl BracketStructure {
    pub fn expected_matches_in_round(&self, round: i32) -> usize {
        if round < 1 {
            return 0;
        }
        self.matches_per_round
            .get(round as usize - 1)
            .copied()
            .unwrap_or(0)
    }
}

pub fn calculate_bracket_structure(team_count: usize) -> Result<BracketStructure, BracketError> {
    if team_count < 2 {
        return Err(BracketError::TooFewTeams(team_count));
    }
    let too_many = BracketError::TooManyTeams {
        max: MAX_BRACKET_TEAMS,
        actual: team_count,
    };
    if team_count > MAX_BRACKET_TEAMS {
        return Err(too_many);
    }

    let bracket_size = team_count.checked_next_power_of_two().ok_or(too_many)?;
    let total_rounds = bracket_size.trailing_zeros();
    let matches_per_round = (1..=total_rounds)
        .map(|r| bracket_size >> r)
        .collect();

    Ok(BracketStructure {
        team_count,
        total_rounds,
        is_power_of_two: team_count.is_power_of_two(),
        bracket_size,
        byes: bracket_size - team_count,
        matches_per_round,
        total_matches: bracket_size - 1,
        playable_matches: team_count - 1,
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NextSlot {
    pub round: i32,
    pub match_number: i32,
    pub slot: Slot,
}

pub fn next_slot(round: i32, match_number: i32) -> NextSlot {
    NextSlot {
        round: round + 1,
        match_number: (match_number + 1) / 2,
        slot: if match_number % 2 == 1 {
            Slot::Team1
        } else {
            Slot::Team2
        },
    }
}

/// Seed order for a bracket of `size` slots: 1 v size, then the seeds that
/// keep the top two apart until the final.
pub fn seed_order(size: usize) -> Vec<usize> {
    let mut order = vec![1];
    while order.len() < size {
        let n = order.len() * 2;
        order = order.iter().flat_map(|&s| [s, n + 1 - s]).collect();
    }
    order
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannedMatch {
    pub round_number: i32,
    pub match_number: i32,
    pub team1_id: Option<Uuid>,
    pub team2_id: Option<Uuid>,
    pub winner_id: Option<Uuid>,
    pub status: MatchStatus,
}

impl PlannedMatch {
    fn empty(round_number: i32, match_number: i32) -> Self {
        Self {
            round_number,
            match_number,
            team1_id: None,
            team2_id: None,
            winner_id: None,
            status: MatchStatus::Pending,
        }
    }

    fn set_slot(&mut self, slot: Slot, team_id: Uuid) {
        match slot {
            Slot::Team1 => self.team1_id = Some(team_id),
            Slot::Team2 => self.team2_id = Some(team_id),
        }
    }
}

/// Every match of a single-elimination bracket for teams given in seed
/// order. Bye matches are created completed with the present team as the
/// winner, already advanced into round two.
pub fn generate_single_elimination(seeded_team_ids: &[Uuid]) -> Result<Vec<PlannedMatch>, BracketError> {
    let structure = calculate_bracket_structure(seeded_team_ids.len())?;

    let mut seen = HashSet::with_capacity(seeded_team_ids.len());
    for id in seeded_team_ids {
        if !seen.insert(*id) {
            return Err(BracketError::DuplicateTeam(*id));
        }
    }

    let mut rounds: Vec<Vec<PlannedMatch>> = structure
        .matches_per_round
        .iter()
        .enumerate()
        .map(|(r, &count)| {
            (1..=count as i32)
                .map(|m| PlannedMatch::empty(r as i32 + 1, m))
                .collect()
        })
        .collect();

    let team_for_seed = |seed: usize| seeded_team_ids.get(seed - 1).copied();
    let order = seed_order(structure.bracket_size);

    for (i, pair) in order.chunks(2).enumerate() {
        let team1 = team_for_seed(pair[0]);
        let team2 = team_for_seed(pair[1]);
        let first = &mut rounds[0][i];
        first.team1_id = team1;
        first.team2_id = team2;

        let bye_winner = match (team1, team2) {
            (Some(t), None) | (None, Some(t)) => Some(t),
            _ => None,
        };
        if let Some(winner) = bye_winner {
            first.winner_id = Some(winner);
            first.status = MatchStatus::Completed;
            let next = next_slot(1, first.match_number);
            if let Some(second_round) = rounds.get_mut(1) {
                second_round[next.match_number as usize - 1].set_slot(next.slot, winner);
            }
        }
    }

    Ok(rounds.into_iter().flatten().collect())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressionIssue {
    RoundSizeMismatch {
        round: i32,
        expected: usize,
        actual: usize,
    },
    WinnerNotInMatch {
        match_id: Uuid,
        winner_id: Uuid,
    },
    MissingNextMatch {
        round: i32,
        match_number: i32,
    },
    MissingAdvancement {
        feeder_match_id: Uuid,
        next_match_id: Uuid,
        slot: Slot,
        team_id: Uuid,
    },
    WrongTeamInSlot {
        feeder_match_id: Uuid,
        next_match_id: Uuid,
        slot: Slot,
        expected: Uuid,
        found: Uuid,
    },
    PrematureAdvancement {
        feeder_match_id: Uuid,
        next_match_id: Uuid,
        slot: Slot,
        team_id: Uuid,
    },
}

/// A direct slot correction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BracketFix {
    pub match_id: Uuid,
    pub slot: Slot,
    pub team_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionReport {
    pub structure: BracketStructure,
    pub checked: usize,
    pub issues: Vec<ProgressionIssue>,
    pub fixes: Vec<BracketFix>,
}

impl ProgressionReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Checks every completed match's winner against the slot it should occupy
/// in the next round. Slots of an already completed next match are reported
/// but never queued as fixes.
pub fn validate_progression(
    matches: &[BracketMatch],
    team_count: usize,
) -> Result<ProgressionReport, BracketError> {
    let structure = calculate_bracket_structure(team_count)?;
    let mut issues = Vec::new();
    let mut fixes = Vec::new();

    let mut sorted: Vec<&BracketMatch> = matches.iter().collect();
    sorted.sort_by_key(|m| (m.round_number, m.match_number));

    let by_position: HashMap<(i32, i32), &BracketMatch> = sorted
        .iter()
        .map(|m| ((m.round_number, m.match_number), *m))
        .collect();

    let mut round_sizes: HashMap<i32, usize> = HashMap::new();
    for m in &sorted {
        *round_sizes.entry(m.round_number).or_default() += 1;
    }
    let last_round = structure.total_rounds as i32;
    let max_round = round_sizes.keys().copied().max().unwrap_or(0).max(last_round);
    for round in 1..=max_round {
        let expected = structure.expected_matches_in_round(round);
        let actual = round_sizes.get(&round).copied().unwrap_or(0);
        if expected != actual {
            issues.push(ProgressionIssue::RoundSizeMismatch {
                round,
                expected,
                actual,
            });
        }
    }

    let mut missing_next = HashSet::new();

    for feeder in &sorted {
        let winner = match feeder.winner_id {
            Some(w) if feeder.is_completed() => {
                if !feeder.has_team(w) {
                    issues.push(ProgressionIssue::WinnerNotInMatch {
                        match_id: feeder.id,
                        winner_id: w,
                    });
                    continue;
                }
                Some(w)
            }
            _ => None,
        };

        if feeder.round_number >= last_round {
            continue;
        }

        let target = next_slot(feeder.round_number, feeder.match_number);
        let Some(next) = by_position.get(&(target.round, target.match_number)) else {
            if missing_next.insert((target.round, target.match_number)) {
                issues.push(ProgressionIssue::MissingNextMatch {
                    round: target.round,
                    match_number: target.match_number,
                });
            }
            continue;
        };

        let occupant = next.team_in(target.slot);
        let fixable = !next.is_completed();

        match (winner, occupant) {
            (Some(w), None) => {
                issues.push(ProgressionIssue::MissingAdvancement {
                    feeder_match_id: feeder.id,
                    next_match_id: next.id,
                    slot: target.slot,
                    team_id: w,
                });
                if fixable {
                    fixes.push(BracketFix {
                        match_id: next.id,
                        slot: target.slot,
                        team_id: w,
                    });
                }
            }
            (Some(w), Some(found)) if found != w => {
                issues.push(ProgressionIssue::WrongTeamInSlot {
                    feeder_match_id: feeder.id,
                    next_match_id: next.id,
                    slot: target.slot,
                    expected: w,
                    found,
                });
                if fixable {
                    fixes.push(BracketFix {
                        match_id: next.id,
                        slot: target.slot,
                        team_id: w,
                    });
                }
            }
            (None, Some(found)) => {
                issues.push(ProgressionIssue::PrematureAdvancement {
                    feeder_match_id: feeder.id,
                    next_match_id: next.id,
                    slot: target.slot,
                    team_id: found,
                });
            }
            _ => {}
        }
    }

    Ok(ProgressionReport {
        structure,
        checked: sorted.len(),
        issues,
        fixes,
    })
}
