use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::player::StreamlinedPlayer;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tournament {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: TournamentStatus,
    pub max_teams: i32,
    pub team_size: i32,
    pub start_time: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub winner_team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "tournament_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Draft,
    RegistrationOpen,
    Balancing,
    Live,
    Completed,
    Cancelled,
}

impl TournamentStatus {
    /// Tournaments players can still find and follow.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            TournamentStatus::RegistrationOpen | TournamentStatus::Balancing | TournamentStatus::Live
        )
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentStatus::Draft => write!(f, "draft"),
            TournamentStatus::RegistrationOpen => write!(f, "registration_open"),
            TournamentStatus::Balancing => write!(f, "balancing"),
            TournamentStatus::Live => write!(f, "live"),
            TournamentStatus::Completed => write!(f, "completed"),
            TournamentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub name: String,
    pub seed: Option<i32>,
    pub captain_id: Option<Uuid>,
    pub total_weight: i32,
    pub is_auto_generated: bool,
    pub created_at: DateTime<Utc>,
}

/// Team member joined with the user's rank data.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeamMemberView {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub current_rank: Option<String>,
    pub weight_rating: i32,
    pub is_captain: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamWithMembers {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<TeamMemberView>,
}

/// A solo signup row joined with the player's rank data, ready to become a
/// [`StreamlinedPlayer`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SignupPlayer {
    pub user_id: Uuid,
    pub username: String,
    pub current_rank: Option<String>,
    pub peak_rank: Option<String>,
    pub manual_weight_override: Option<i32>,
    pub tournaments_won: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TournamentListResponse {
    pub tournaments: Vec<Tournament>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Persisted result of balancing a tournament's signups.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalancedTeamsResponse {
    pub tournament_id: Uuid,
    pub teams: Vec<PersistedTeam>,
    pub substitutes: Vec<StreamlinedPlayer>,
    pub quality: crate::service::atlas_service::BalanceQuality,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedTeam {
    pub team_id: Uuid,
    pub name: String,
    pub seed: i32,
    pub total_weight: u32,
    pub players: Vec<StreamlinedPlayer>,
}
