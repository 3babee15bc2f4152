use crate::models::veto::VetoChangeEvent;
use actix::{Message, Recipient};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// A change-feed event addressed to one veto session's subscribers.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct VetoBroadcast {
    pub session_id: Uuid,
    pub event: VetoChangeEvent,
}

type Subscribers = HashMap<Uuid, HashMap<Uuid, Recipient<VetoBroadcast>>>;

/// Registry of WebSocket connections per veto session.
#[derive(Clone, Default)]
pub struct VetoHub {
    sessions: Arc<Mutex<Subscribers>>,
}

impl VetoHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        // Entries stay consistent even if a holder panicked.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self, session_id: Uuid, connection_id: Uuid, recipient: Recipient<VetoBroadcast>) {
        self.lock()
            .entry(session_id)
            .or_default()
            .insert(connection_id, recipient);
        debug!(session_id = %session_id, connection_id = %connection_id, "Veto subscriber added");
    }

    pub fn unsubscribe(&self, session_id: Uuid, connection_id: Uuid) {
        let mut sessions = self.lock();
        if let Some(subscribers) = sessions.get_mut(&session_id) {
            subscribers.remove(&connection_id);
            if subscribers.is_empty() {
                sessions.remove(&session_id);
            }
        }
        debug!(session_id = %session_id, connection_id = %connection_id, "Veto subscriber removed");
    }

    /// Sends the event to every live subscriber of its session and drops
    /// the ones whose actor has stopped. Returns the number delivered.
    pub fn publish(&self, event: VetoChangeEvent) -> usize {
        let session_id = event.session_id();
        let mut sessions = self.lock();
        let Some(subscribers) = sessions.get_mut(&session_id) else {
            return 0;
        };

        subscribers.retain(|_, recipient| recipient.connected());
        for recipient in subscribers.values() {
            recipient.do_send(VetoBroadcast {
                session_id,
                event: event.clone(),
            });
        }
        let delivered = subscribers.len();
        if subscribers.is_empty() {
            sessions.remove(&session_id);
        }
        delivered
    }

    pub fn subscriber_count(&self, session_id: Uuid) -> usize {
        self.lock().get(&session_id).map(|s| s.len()).unwrap_or(0)
    }
}
