use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::notification::*;
use crate::service::email_service::{render_notification, EmailService};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// In-app notifications plus optional email fan-out.
pub struct NotificationService {
    db_pool: DbPool,
    email: EmailService,
}

impl NotificationService {
    pub fn new(db_pool: DbPool, email: EmailService) -> Self {
        Self { db_pool, email }
    }

    async fn resolve_audience(&self, audience: &Audience) -> Result<Vec<EmailRecipient>, ApiError> {
        let recipients = match audience {
            Audience::Users { user_ids } => {
                sqlx::query_as::<_, EmailRecipient>(
                    r#"
                    SELECT id AS user_id, username, email, email_notifications
                    FROM users
                    WHERE id = ANY($1)
                    "#,
                )
                .bind(user_ids)
                .fetch_all(&self.db_pool)
                .await?
            }
            Audience::Tournament { tournament_id } => {
                sqlx::query_as::<_, EmailRecipient>(
                    r#"
                    SELECT DISTINCT u.id AS user_id, u.username, u.email, u.email_notifications
                    FROM team_members m
                    JOIN teams t ON t.id = m.team_id
                    JOIN users u ON u.id = m.user_id
                    WHERE t.tournament_id = $1
                    "#,
                )
                .bind(tournament_id)
                .fetch_all(&self.db_pool)
                .await?
            }
        };
        Ok(recipients)
    }

    /// Creates one in-app notification per recipient, then emails the ones
    /// that opted in. Email failures are counted, never rolled back.
    pub async fn dispatch(&self, request: DispatchNotificationRequest) -> Result<DispatchSummary, ApiError> {
        request.validate()?;

        let recipients = self.resolve_audience(&request.audience).await?;
        let mut summary = DispatchSummary {
            recipients: recipients.len(),
            ..Default::default()
        };
        if recipients.is_empty() {
            return Ok(summary);
        }

        let user_ids: Vec<Uuid> = recipients.iter().map(|r| r.user_id).collect();
        let data = request.data.clone().unwrap_or_else(|| serde_json::json!({}));

        summary.in_app_created = sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, message, data)
            SELECT gen_random_uuid(), r.user_id, $2, $3, $4, $5
            FROM UNNEST($1::uuid[]) AS r(user_id)
            "#,
        )
        .bind(&user_ids)
        .bind(request.kind)
        .bind(&request.title)
        .bind(&request.message)
        .bind(&data)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        if request.send_email {
            if !self.email.is_enabled() {
                warn!("Email requested but delivery is not configured");
            } else {
                for recipient in recipients.iter().filter(|r| r.email_notifications) {
                    let Some(address) = recipient.email.as_deref() else {
                        continue;
                    };
                    let html = render_notification(&recipient.username, &request.title, &request.message);
                    match self.email.send(address, &request.title, &html).await {
                        Ok(()) => summary.emails_sent += 1,
                        Err(e) => {
                            summary.emails_failed += 1;
                            warn!(user_id = %recipient.user_id, error = %e, "Notification email failed");
                        }
                    }
                }
            }
        }

        info!(
            kind = ?request.kind,
            recipients = summary.recipients,
            in_app = summary.in_app_created,
            emails_sent = summary.emails_sent,
            emails_failed = summary.emails_failed,
            "Notification dispatched"
        );

        Ok(summary)
    }

    pub async fn list_for_user(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>, ApiError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR NOT read)
            ORDER BY created_at DESC
            LIMIT 100
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(notifications)
    }

    /// Marks the caller's own notifications read; ids of other users are
    /// ignored.
    pub async fn mark_read(&self, user_id: Uuid, ids: &[Uuid]) -> Result<u64, ApiError> {
        let updated = sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(ids)
            .execute(&self.db_pool)
            .await?
            .rows_affected();
        Ok(updated)
    }
}
