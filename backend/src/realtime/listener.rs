use crate::config::RealtimeConfig;
use crate::db::DbPool;
use crate::models::veto::VetoChangeEvent;
use crate::realtime::backoff::BackoffPolicy;
use crate::realtime::hub::VetoHub;
use sqlx::postgres::PgListener;
use tracing::{debug, error, info, warn};

/// Decodes one notification payload. Malformed payloads are logged and
/// skipped.
pub fn decode_payload(payload: &str) -> Option<VetoChangeEvent> {
    match serde_json::from_str::<VetoChangeEvent>(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, payload, "Ignoring malformed veto notification");
            None
        }
    }
}

async fn listen(pool: &DbPool, hub: &VetoHub, channel: &str, on_connected: impl FnOnce()) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(channel).await?;
    info!(channel, "Veto change feed connected");
    on_connected();

    loop {
        // `None` means the connection dropped; reconnect from the top.
        let Some(notification) = listener.try_recv().await? else {
            warn!(channel, "Veto change feed connection lost");
            return Ok(());
        };

        if let Some(event) = decode_payload(notification.payload()) {
            let delivered = hub.publish(event.clone());
            debug!(
                session_id = %event.session_id(),
                delivered,
                "Veto change published"
            );
        }
    }
}

/// Forwards `pg_notify` events on the configured channel to the hub,
/// reconnecting with exponential backoff for as long as the task runs.
pub async fn run_veto_listener(pool: DbPool, hub: VetoHub, config: RealtimeConfig) {
    let policy = BackoffPolicy::from(&config);
    let mut backoff = policy.start();

    loop {
        let result = listen(&pool, &hub, &config.channel, || backoff.reset()).await;
        if let Err(e) = result {
            error!(channel = %config.channel, error = %e, "Veto change feed failed");
        }

        let Some(delay) = backoff.next_delay() else {
            error!(channel = %config.channel, "Veto change feed retries exhausted");
            return;
        };
        info!(
            channel = %config.channel,
            attempt = backoff.attempts(),
            delay_ms = delay.as_millis() as u64,
            "Reconnecting veto change feed"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::veto::VetoStatus;
    use uuid::Uuid;

    #[test]
    fn test_decode_valid_payload() {
        let session_id = Uuid::new_v4();
        let payload = format!(
            r#"{{"type":"session_updated","session_id":"{}","status":"in_progress","current_turn_team_id":null}}"#,
            session_id
        );
        let event = decode_payload(&payload).unwrap();
        assert_eq!(
            event,
            VetoChangeEvent::SessionUpdated {
                session_id,
                status: VetoStatus::InProgress,
                current_turn_team_id: None,
            }
        );
    }

    #[test]
    fn test_decode_malformed_payload() {
        assert!(decode_payload("not json").is_none());
        assert!(decode_payload(r#"{"type":"unknown"}"#).is_none());
    }
}
