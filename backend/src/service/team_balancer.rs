//! Quick-match team balancer.
//!
//! Splits exactly ten players into two teams of five. Players are taken
//! strongest first and each joins whichever team currently has the lower
//! total evidence weight (team A on ties), so the strongest player is
//! offset by the next two strongest, and so on down the list.

use crate::api_error::ApiError;
use crate::models::player::BalancerPlayer;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const QUICK_MATCH_PLAYERS: usize = 10;
pub const QUICK_MATCH_TEAM_SIZE: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum BalanceError {
    #[error("Quick match requires exactly {expected} players, got {actual}")]
    WrongPlayerCount { expected: usize, actual: usize },

    #[error("Need {required} players for {team_count} teams of {team_size}, got {actual}")]
    InsufficientPlayers {
        required: usize,
        actual: usize,
        team_count: usize,
        team_size: usize,
    },

    #[error("Invalid team shape: {0}")]
    InvalidTeamShape(String),

    #[error("Player {0} appears more than once")]
    DuplicatePlayer(Uuid),
}

impl From<BalanceError> for ApiError {
    fn from(e: BalanceError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuickMatchTeam {
    TeamA,
    TeamB,
}

impl std::fmt::Display for QuickMatchTeam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuickMatchTeam::TeamA => write!(f, "Team A"),
            QuickMatchTeam::TeamB => write!(f, "Team B"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedPlayer {
    /// Position of the player in the balancer input.
    pub index: usize,
    pub player: BalancerPlayer,
    pub team: QuickMatchTeam,
    /// Same for every player of a pass; derived from the final weight delta.
    pub confidence: u8,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickMatchBalance {
    pub team_a: Vec<AssignedPlayer>,
    pub team_b: Vec<AssignedPlayer>,
    pub team_a_total: u32,
    pub team_b_total: u32,
    pub weight_delta: u32,
    pub balance_confidence: u8,
}

impl QuickMatchBalance {
    pub fn team_indices(&self, team: QuickMatchTeam) -> Vec<usize> {
        let players = match team {
            QuickMatchTeam::TeamA => &self.team_a,
            QuickMatchTeam::TeamB => &self.team_b,
        };
        players.iter().map(|p| p.index).collect()
    }
}

/// Maps a final weight delta onto 0-100. A delta equal to `threshold`
/// scores 75, four thresholds or more scores 0.
pub fn balance_confidence(weight_delta: u32, threshold: f64) -> u8 {
    if threshold <= 0.0 {
        return if weight_delta == 0 { 100 } else { 0 };
    }
    let score = 100.0 * (1.0 - weight_delta as f64 / (4.0 * threshold));
    score.clamp(0.0, 100.0).round() as u8
}

pub fn balance_quick_match_teams(
    players: &[BalancerPlayer],
    confidence_threshold: f64,
) -> Result<QuickMatchBalance, BalanceError> {
    if players.len() != QUICK_MATCH_PLAYERS {
        return Err(BalanceError::WrongPlayerCount {
            expected: QUICK_MATCH_PLAYERS,
            actual: players.len(),
        });
    }

    let mut seen = HashSet::with_capacity(players.len());
    for p in players {
        if !seen.insert(p.id) {
            return Err(BalanceError::DuplicatePlayer(p.id));
        }
    }

    // Stable: equal weights keep their input order.
    let mut order: Vec<usize> = (0..players.len()).collect();
    order.sort_by(|&a, &b| players[b].evidence_weight.cmp(&players[a].evidence_weight));

    let mut team_a: Vec<(usize, String)> = Vec::with_capacity(QUICK_MATCH_TEAM_SIZE);
    let mut team_b: Vec<(usize, String)> = Vec::with_capacity(QUICK_MATCH_TEAM_SIZE);
    let mut total_a = 0u32;
    let mut total_b = 0u32;

    for index in order {
        let weight = players[index].evidence_weight;
        let team = if team_a.len() == QUICK_MATCH_TEAM_SIZE {
            QuickMatchTeam::TeamB
        } else if team_b.len() == QUICK_MATCH_TEAM_SIZE {
            QuickMatchTeam::TeamA
        } else if total_a <= total_b {
            QuickMatchTeam::TeamA
        } else {
            QuickMatchTeam::TeamB
        };

        let reasoning = format!(
            "Weight {} joined {} with totals at {} vs {}",
            weight, team, total_a, total_b
        );

        match team {
            QuickMatchTeam::TeamA => {
                total_a += weight;
                team_a.push((index, reasoning));
            }
            QuickMatchTeam::TeamB => {
                total_b += weight;
                team_b.push((index, reasoning));
            }
        }
    }

    let weight_delta = total_a.abs_diff(total_b);
    let confidence = balance_confidence(weight_delta, confidence_threshold);

    debug!(
        team_a_total = total_a,
        team_b_total = total_b,
        weight_delta,
        confidence,
        "Quick match balanced"
    );

    let finish = |members: Vec<(usize, String)>, team: QuickMatchTeam| -> Vec<AssignedPlayer> {
        members
            .into_iter()
            .map(|(index, reasoning)| AssignedPlayer {
                index,
                player: players[index].clone(),
                team,
                confidence,
                reasoning,
            })
            .collect()
    };

    Ok(QuickMatchBalance {
        team_a: finish(team_a, QuickMatchTeam::TeamA),
        team_b: finish(team_b, QuickMatchTeam::TeamB),
        team_a_total: total_a,
        team_b_total: total_b,
        weight_delta,
        balance_confidence: confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_curve() {
        assert_eq!(balance_confidence(0, 50.0), 100);
        assert_eq!(balance_confidence(50, 50.0), 75);
        assert_eq!(balance_confidence(100, 50.0), 50);
        assert_eq!(balance_confidence(200, 50.0), 0);
        assert_eq!(balance_confidence(1_000, 50.0), 0);
    }

    #[test]
    fn test_zero_threshold() {
        assert_eq!(balance_confidence(0, 0.0), 100);
        assert_eq!(balance_confidence(1, 0.0), 0);
    }
}
