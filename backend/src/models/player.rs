use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Platform user as stored in `users`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlayerProfile {
    pub id: Uuid,
    pub discord_id: Option<String>,
    pub username: String,
    pub email: Option<String>,
    pub current_rank: Option<String>,
    pub peak_rank: Option<String>,
    pub weight_rating: i32,
    pub manual_weight_override: Option<i32>,
    pub tournaments_won: i32,
    pub email_notifications: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input to the quick-match balancer. Built from query results and dropped
/// after one balancing pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalancerPlayer {
    pub id: Uuid,
    pub display_name: String,
    pub rank: Option<String>,
    pub evidence_weight: u32,
}

/// Input to ATLAS team assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamlinedPlayer {
    pub id: Uuid,
    pub display_name: String,
    pub rank: Option<String>,
    pub weight: u32,
}

impl StreamlinedPlayer {
    pub fn is_elite(&self, elite_threshold: u32) -> bool {
        self.weight >= elite_threshold
    }
}

impl From<BalancerPlayer> for StreamlinedPlayer {
    fn from(p: BalancerPlayer) -> Self {
        Self {
            id: p.id,
            display_name: p.display_name,
            rank: p.rank,
            weight: p.evidence_weight,
        }
    }
}

/// One team produced by ATLAS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamData {
    pub name: String,
    pub players: Vec<StreamlinedPlayer>,
    pub total_weight: u32,
    pub elite_count: usize,
}

impl TeamData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            players: Vec::new(),
            total_weight: 0,
            elite_count: 0,
        }
    }

    pub fn push(&mut self, player: StreamlinedPlayer, elite_threshold: u32) {
        self.total_weight += player.weight;
        if player.is_elite(elite_threshold) {
            self.elite_count += 1;
        }
        self.players.push(player);
    }

    pub fn average_weight(&self) -> f64 {
        if self.players.is_empty() {
            return 0.0;
        }
        self.total_weight as f64 / self.players.len() as f64
    }
}

/// Where a player's evidence weight came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeightSource {
    ManualOverride,
    CurrentRank,
    PeakRank,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceWeight {
    pub weight: u32,
    pub source: WeightSource,
    pub tournament_bonus: u32,
}
