pub mod admin_handler;
pub mod ai_chat_handler;
pub mod balance_handler;
pub mod bracket_handler;
pub mod discord_handler;
pub mod health;
pub mod notification_handler;
pub mod tournament_handler;
pub mod veto_handler;
pub mod veto_ws_handler;

use crate::auth::JwtService;
use actix_web::web;

/// Every HTTP and WebSocket route of the platform.
pub fn configure_routes(cfg: &mut web::ServiceConfig, jwt: &JwtService) {
    cfg.route("/api/health", web::get().to(health::health_check));
    balance_handler::configure_routes(cfg);
    bracket_handler::configure_routes(cfg, jwt);
    tournament_handler::configure_routes(cfg);
    veto_handler::configure_routes(cfg, jwt);
    veto_ws_handler::configure_ws_routes(cfg);
    notification_handler::configure_routes(cfg, jwt);
    ai_chat_handler::configure_routes(cfg, jwt);
    admin_handler::configure_routes(cfg, jwt);
    discord_handler::configure_routes(cfg);
}
