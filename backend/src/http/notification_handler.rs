use crate::api_error::ApiError;
use crate::auth::{AuthMiddleware, ClaimsExt, JwtService};
use crate::models::notification::MarkReadRequest;
use crate::service::notification_service::NotificationService;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// GET /api/notifications
/// Caller's latest notifications, newest first
pub async fn list_notifications(
    service: web::Data<NotificationService>,
    http_req: HttpRequest,
    query: web::Query<ListNotificationsQuery>,
) -> Result<impl Responder, ApiError> {
    let user_id = http_req.user_id()?;
    let notifications = service.list_for_user(user_id, query.unread_only).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

/// POST /api/notifications/read
pub async fn mark_read(
    service: web::Data<NotificationService>,
    http_req: HttpRequest,
    req: web::Json<MarkReadRequest>,
) -> Result<impl Responder, ApiError> {
    let user_id = http_req.user_id()?;
    if req.ids.is_empty() {
        return Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": 0 })));
    }

    let updated = service.mark_read(user_id, &req.ids).await?;
    debug!(user_id = %user_id, updated, "Notifications marked read");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, jwt: &JwtService) {
    cfg.service(
        web::scope("/api/notifications")
            .wrap(AuthMiddleware::new(jwt.clone()))
            .route("", web::get().to(list_notifications))
            .route("/read", web::post().to(mark_read)),
    );
}
