use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A single-elimination bracket match.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BracketMatch {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub round_number: i32,
    pub match_number: i32,
    pub team1_id: Option<Uuid>,
    pub team2_id: Option<Uuid>,
    pub winner_id: Option<Uuid>,
    pub team1_score: Option<i32>,
    pub team2_score: Option<i32>,
    pub status: MatchStatus,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BracketMatch {
    pub fn has_team(&self, team_id: Uuid) -> bool {
        self.team1_id == Some(team_id) || self.team2_id == Some(team_id)
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    pub fn team_in(&self, slot: Slot) -> Option<Uuid> {
        match slot {
            Slot::Team1 => self.team1_id,
            Slot::Team2 => self.team2_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "match_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Live,
    Completed,
    Cancelled,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStatus::Pending => write!(f, "pending"),
            MatchStatus::Live => write!(f, "live"),
            MatchStatus::Completed => write!(f, "completed"),
            MatchStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Which side of a match a team occupies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Team1,
    Team2,
}

impl Slot {
    pub fn column(&self) -> &'static str {
        match self {
            Slot::Team1 => "team1_id",
            Slot::Team2 => "team2_id",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportResultRequest {
    pub winner_id: Uuid,
    #[validate(range(min = 0, max = 99))]
    pub team1_score: Option<i32>,
    #[validate(range(min = 0, max = 99))]
    pub team2_score: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BracketMatch {
        let now = Utc::now();
        BracketMatch {
            id: Uuid::new_v4(),
            tournament_id: Uuid::new_v4(),
            round_number: 1,
            match_number: 1,
            team1_id: Some(Uuid::new_v4()),
            team2_id: None,
            winner_id: None,
            team1_score: None,
            team2_score: None,
            status: MatchStatus::Pending,
            scheduled_time: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_has_team_and_slots() {
        let m = sample();
        let team1 = m.team1_id.unwrap();
        assert!(m.has_team(team1));
        assert!(!m.has_team(Uuid::new_v4()));
        assert_eq!(m.team_in(Slot::Team1), Some(team1));
        assert_eq!(m.team_in(Slot::Team2), None);
        assert!(!m.is_completed());
    }

    #[test]
    fn test_slot_columns() {
        assert_eq!(Slot::Team1.column(), "team1_id");
        assert_eq!(Slot::Team2.column(), "team2_id");
    }

    #[test]
    fn test_report_result_validation() {
        let ok = ReportResultRequest {
            winner_id: Uuid::new_v4(),
            team1_score: Some(13),
            team2_score: Some(11),
        };
        assert!(ok.validate().is_ok());

        let bad = ReportResultRequest {
            winner_id: Uuid::new_v4(),
            team1_score: Some(-1),
            team2_score: None,
        };
        assert!(bad.validate().is_err());
    }
}
