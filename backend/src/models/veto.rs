use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Competitive map pool used when a session does not supply its own.
pub const DEFAULT_MAP_POOL: &[&str] = &["Abyss", "Ascent", "Bind", "Haven", "Icebox", "Lotus", "Sunset"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "veto_format", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VetoFormat {
    Bo1,
    Bo3,
}

impl VetoFormat {
    /// Maps that end up being played.
    pub fn maps_played(&self) -> usize {
        match self {
            VetoFormat::Bo1 => 1,
            VetoFormat::Bo3 => 3,
        }
    }
}

/// Veto session lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "veto_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VetoStatus {
    Pending,
    InProgress,
    Completed,
}

impl VetoStatus {
    pub fn can_transition_to(&self, to: &VetoStatus) -> bool {
        match (self, to) {
            (VetoStatus::Pending, VetoStatus::InProgress) => true,
            (VetoStatus::InProgress, VetoStatus::Completed) => true,
            // Bo1 sessions cannot finish on the first action, but a
            // replayed session may jump straight to completed.
            (VetoStatus::Pending, VetoStatus::Completed) => true,
            (a, b) if a == b => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VetoStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "veto_action_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VetoActionType {
    Ban,
    Pick,
    Side,
    /// The last remaining map, recorded automatically.
    Decider,
}

impl std::fmt::Display for VetoActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VetoActionType::Ban => write!(f, "ban"),
            VetoActionType::Pick => write!(f, "pick"),
            VetoActionType::Side => write!(f, "side"),
            VetoActionType::Decider => write!(f, "decider"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "map_side", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MapSide {
    Attack,
    Defense,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VetoSession {
    pub id: Uuid,
    pub match_id: Uuid,
    pub format: VetoFormat,
    pub status: VetoStatus,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub map_pool: Vec<String>,
    pub current_turn_team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct VetoAction {
    pub id: Uuid,
    pub session_id: Uuid,
    pub order_number: i32,
    pub action_type: VetoActionType,
    /// `None` for the automatic decider.
    pub team_id: Option<Uuid>,
    pub map_name: Option<String>,
    pub side: Option<MapSide>,
    pub performed_at: DateTime<Utc>,
}

/// Change-feed payload emitted by the database triggers on
/// `map_veto_actions` and `map_veto_sessions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VetoChangeEvent {
    ActionRecorded {
        session_id: Uuid,
        action: VetoAction,
    },
    SessionUpdated {
        session_id: Uuid,
        status: VetoStatus,
        current_turn_team_id: Option<Uuid>,
    },
}

impl VetoChangeEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            VetoChangeEvent::ActionRecorded { session_id, .. } => *session_id,
            VetoChangeEvent::SessionUpdated { session_id, .. } => *session_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateVetoSessionRequest {
    pub match_id: Uuid,
    pub format: VetoFormat,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    #[validate(length(min = 3, max = 12))]
    pub map_pool: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformVetoActionRequest {
    pub team_id: Uuid,
    pub action_type: VetoActionType,
    pub map_name: Option<String>,
    pub side: Option<MapSide>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VetoSessionResponse {
    pub session: VetoSession,
    pub actions: Vec<VetoAction>,
    pub next_step: Option<crate::service::veto_engine::VetoStep>,
    pub remaining_maps: Vec<String>,
    pub picked_maps: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(VetoStatus::Pending.can_transition_to(&VetoStatus::InProgress));
        assert!(VetoStatus::InProgress.can_transition_to(&VetoStatus::Completed));
        assert!(VetoStatus::InProgress.can_transition_to(&VetoStatus::InProgress));
        assert!(!VetoStatus::Completed.can_transition_to(&VetoStatus::InProgress));
        assert!(!VetoStatus::InProgress.can_transition_to(&VetoStatus::Pending));
        assert!(VetoStatus::Completed.is_terminal());
    }

    #[test]
    fn test_change_event_from_trigger_payload() {
        let session_id = Uuid::new_v4();
        let team_id = Uuid::new_v4();
        let payload = serde_json::json!({
            "type": "action_recorded",
            "session_id": session_id,
            "action": {
                "id": Uuid::new_v4(),
                "session_id": session_id,
                "order_number": 1,
                "action_type": "ban",
                "team_id": team_id,
                "map_name": "Bind",
                "side": null,
                "performed_at": "2026-03-01T18:30:00.123456+00:00"
            }
        });

        let event: VetoChangeEvent = serde_json::from_value(payload).unwrap();
        assert_eq!(event.session_id(), session_id);
        match event {
            VetoChangeEvent::ActionRecorded { action, .. } => {
                assert_eq!(action.action_type, VetoActionType::Ban);
                assert_eq!(action.map_name.as_deref(), Some("Bind"));
                assert_eq!(action.team_id, Some(team_id));
            }
            _ => panic!("Expected ActionRecorded"),
        }
    }

    #[test]
    fn test_session_updated_payload() {
        let payload = r#"{"type":"session_updated","session_id":"6f1c2b9e-8d7a-4f3b-9a51-0c2e7d4b1a90","status":"completed","current_turn_team_id":null}"#;
        let event: VetoChangeEvent = serde_json::from_str(payload).unwrap();
        assert!(matches!(
            event,
            VetoChangeEvent::SessionUpdated { status: VetoStatus::Completed, .. }
        ));
    }
}
