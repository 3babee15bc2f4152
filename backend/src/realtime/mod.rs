//! Database change feed for map vetoes.
//!
//! Triggers on the veto tables `pg_notify` every change; the listener task
//! relays them to the hub, which fans them out to WebSocket connections.
//! Clients load a snapshot over HTTP once and apply pushed events after.

pub mod backoff;
pub mod hub;
pub mod listener;

pub use backoff::{Backoff, BackoffPolicy};
pub use hub::{VetoBroadcast, VetoHub};
pub use listener::run_veto_listener;
