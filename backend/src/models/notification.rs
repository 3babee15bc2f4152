use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MatchReady,
    VetoTurn,
    TeamAssigned,
    TournamentUpdate,
    Announcement,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Who receives a dispatched notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Audience {
    Users { user_ids: Vec<Uuid> },
    /// Every member of every team in the tournament.
    Tournament { tournament_id: Uuid },
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchNotificationRequest {
    pub audience: Audience,
    pub kind: NotificationKind,
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub send_email: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DispatchSummary {
    pub recipients: usize,
    pub in_app_created: u64,
    pub emails_sent: usize,
    pub emails_failed: usize,
}

/// Recipient row used for email fan-out.
#[derive(Debug, Clone, FromRow)]
pub struct EmailRecipient {
    pub user_id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub email_notifications: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadRequest {
    pub ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_request_parsing() {
        let json = r#"{
            "audience": {"type": "tournament", "tournament_id": "3d0f3a0e-55c2-4f1a-9a3e-1b2c3d4e5f60"},
            "kind": "match_ready",
            "title": "Your match is ready",
            "message": "Join the lobby"
        }"#;
        let req: DispatchNotificationRequest = serde_json::from_str(json).unwrap();
        assert!(matches!(req.audience, Audience::Tournament { .. }));
        assert_eq!(req.kind, NotificationKind::MatchReady);
        assert!(!req.send_email);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_title_rejected() {
        let req = DispatchNotificationRequest {
            audience: Audience::Users { user_ids: vec![] },
            kind: NotificationKind::Announcement,
            title: String::new(),
            message: "hello".to_string(),
            data: None,
            send_email: false,
        };
        assert!(req.validate().is_err());
    }
}
