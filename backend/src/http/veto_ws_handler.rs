use crate::api_error::ApiError;
use crate::models::veto::{VetoChangeEvent, VetoSessionResponse};
use crate::realtime::{VetoBroadcast, VetoHub};
use crate::service::veto_service::VetoService;
use actix::{Actor, ActorContext, ActorFutureExt, AsyncContext, Handler, StreamHandler, WrapFuture};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use futures::future::{FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Messages clients may send.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    Pong,
}

/// Messages pushed to clients.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// State at subscription time; later events apply on top of it.
    Snapshot { snapshot: VetoSessionResponse },
    Event { event: VetoChangeEvent },
    Pong,
    Error { message: String },
}

/// Loads the state a new connection starts from.
pub trait SnapshotSource: 'static {
    fn load(&self, session_id: Uuid) -> LocalBoxFuture<'static, Result<VetoSessionResponse, ApiError>>;
}

impl SnapshotSource for web::Data<VetoService> {
    fn load(&self, session_id: Uuid) -> LocalBoxFuture<'static, Result<VetoSessionResponse, ApiError>> {
        let service = self.clone();
        async move { service.get_session_with_actions(session_id).await }.boxed_local()
    }
}

/// One WebSocket connection following a single veto session.
pub struct VetoSocket {
    id: Uuid,
    session_id: Uuid,
    hb: Instant,
    hub: VetoHub,
    source: Box<dyn SnapshotSource>,
}

impl VetoSocket {
    pub fn new(session_id: Uuid, hub: VetoHub, source: Box<dyn SnapshotSource>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            hb: Instant::now(),
            hub,
            source,
        }
    }

    /// Sends the snapshot before any queued broadcast. The hub subscription
    /// is already live, so an event racing the load arrives afterwards as a
    /// duplicate rather than going missing.
    fn send_snapshot(&self, ctx: &mut <Self as Actor>::Context) {
        let load = self.source.load(self.session_id);
        ctx.wait(load.into_actor(self).map(|result, act: &mut Self, ctx: &mut ws::WebsocketContext<Self>| match result {
            Ok(snapshot) => act.send(&ServerMessage::Snapshot { snapshot }, ctx),
            Err(e) => {
                warn!(connection_id = %act.id, session_id = %act.session_id, error = %e, "Failed to load veto snapshot");
                act.send(
                    &ServerMessage::Error {
                        message: "Veto session unavailable".to_string(),
                    },
                    ctx,
                );
                ctx.stop();
            }
        }));
    }

    fn hb(&self, ctx: &mut <Self as Actor>::Context) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!(connection_id = %act.id, "WebSocket heartbeat timeout, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn send(&self, message: &ServerMessage, ctx: &mut <Self as Actor>::Context) {
        match serde_json::to_string(message) {
            Ok(json) => ctx.text(json),
            Err(e) => error!(connection_id = %self.id, error = %e, "Failed to encode WebSocket message"),
        }
    }

    fn handle_message(&mut self, msg: &str, ctx: &mut <Self as Actor>::Context) {
        match serde_json::from_str::<ClientMessage>(msg) {
            Ok(ClientMessage::Ping) => {
                self.hb = Instant::now();
                self.send(&ServerMessage::Pong, ctx);
            }
            Ok(ClientMessage::Pong) => {
                self.hb = Instant::now();
            }
            Err(e) => {
                debug!(connection_id = %self.id, error = %e, "Unparseable WebSocket message");
                self.send(
                    &ServerMessage::Error {
                        message: "Invalid message format".to_string(),
                    },
                    ctx,
                );
            }
        }
    }
}

impl Actor for VetoSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(connection_id = %self.id, session_id = %self.session_id, "Veto WebSocket connected");
        self.hub
            .subscribe(self.session_id, self.id, ctx.address().recipient());
        self.send_snapshot(ctx);
        self.hb(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.hub.unsubscribe(self.session_id, self.id);
        info!(connection_id = %self.id, session_id = %self.session_id, "Veto WebSocket closed");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for VetoSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.handle_message(&text, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                warn!(connection_id = %self.id, "Binary messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                debug!(connection_id = %self.id, reason = ?reason, "Client initiated close");
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                warn!(connection_id = %self.id, error = %e, "WebSocket protocol error");
                ctx.stop();
            }
            _ => (),
        }
    }
}

impl Handler<VetoBroadcast> for VetoSocket {
    type Result = ();

    fn handle(&mut self, msg: VetoBroadcast, ctx: &mut Self::Context) {
        if msg.session_id == self.session_id {
            self.send(&ServerMessage::Event { event: msg.event }, ctx);
        }
    }
}

/// WS /ws/veto/:session_id
pub async fn veto_websocket(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<Uuid>,
    hub: web::Data<VetoHub>,
    service: web::Data<VetoService>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    if !service.session_exists(session_id).await? {
        return Err(ApiError::not_found("Veto session not found").into());
    }

    ws::start(
        VetoSocket::new(session_id, hub.get_ref().clone(), Box::new(service)),
        &req,
        stream,
    )
}

pub fn configure_ws_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws/veto/{session_id}", web::get().to(veto_websocket));
}
