use crate::api_error::ApiError;
use crate::auth::{AuthMiddleware, ClaimsExt, JwtService};
use crate::models::notification::DispatchNotificationRequest;
use crate::service::atlas_service::AtlasService;
use crate::service::bracket_service::BracketService;
use crate::service::notification_service::NotificationService;
use crate::service::schema_export::export_schema;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Body of the destructive admin endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct DestructiveRequest {
    #[serde(default)]
    pub confirm: bool,
    #[serde(default)]
    pub dry_run: bool,
}

impl DestructiveRequest {
    /// A dry run needs no confirmation.
    pub fn check(&self) -> Result<(), ApiError> {
        if self.dry_run || self.confirm {
            Ok(())
        } else {
            Err(ApiError::bad_request(
                "Set \"confirm\": true to proceed, or \"dry_run\": true to preview",
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BalanceTournamentRequest {
    #[serde(default = "default_team_size")]
    pub team_size: usize,
}

fn default_team_size() -> usize {
    5
}

// =============================================================================
// TEAMS
// =============================================================================

/// POST /api/admin/tournaments/:id/balance
/// Build teams from solo signups with ATLAS
pub async fn balance_tournament(
    service: web::Data<AtlasService>,
    http_req: HttpRequest,
    path: web::Path<Uuid>,
    req: web::Json<BalanceTournamentRequest>,
) -> Result<impl Responder, ApiError> {
    let claims = http_req.require_admin()?;
    let tournament_id = path.into_inner();

    info!(
        tournament_id = %tournament_id,
        team_size = req.team_size,
        admin = %claims.sub,
        "Balancing tournament teams"
    );

    let result = service.balance_tournament(tournament_id, req.team_size).await?;

    Ok(HttpResponse::Ok().json(result))
}

/// POST /api/admin/tournaments/:id/members/reset
pub async fn reset_members(
    service: web::Data<BracketService>,
    http_req: HttpRequest,
    path: web::Path<Uuid>,
    req: web::Json<DestructiveRequest>,
) -> Result<impl Responder, ApiError> {
    let claims = http_req.require_admin()?;
    req.check()?;
    let tournament_id = path.into_inner();

    warn!(
        tournament_id = %tournament_id,
        dry_run = req.dry_run,
        admin = %claims.sub,
        "Resetting team members"
    );

    let summary = service.reset_team_members(tournament_id, req.dry_run).await?;

    Ok(HttpResponse::Ok().json(summary))
}

// =============================================================================
// BRACKET
// =============================================================================

/// POST /api/admin/tournaments/:id/bracket/repair
/// Write the slot corrections the progression check finds
pub async fn repair_bracket(
    service: web::Data<BracketService>,
    http_req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let claims = http_req.require_admin()?;
    let tournament_id = path.into_inner();

    info!(tournament_id = %tournament_id, admin = %claims.sub, "Repairing bracket progression");

    let summary = service.repair_progression(tournament_id).await?;

    Ok(HttpResponse::Ok().json(summary))
}

/// POST /api/admin/tournaments/:id/bracket/reset
/// Regenerate the bracket from seeded teams
pub async fn reset_bracket(
    service: web::Data<BracketService>,
    http_req: HttpRequest,
    path: web::Path<Uuid>,
    req: web::Json<DestructiveRequest>,
) -> Result<impl Responder, ApiError> {
    let claims = http_req.require_admin()?;
    req.check()?;
    let tournament_id = path.into_inner();

    warn!(
        tournament_id = %tournament_id,
        dry_run = req.dry_run,
        admin = %claims.sub,
        "Resetting bracket"
    );

    let summary = service.reset_bracket(tournament_id, req.dry_run).await?;

    Ok(HttpResponse::Ok().json(summary))
}

// =============================================================================
// PLATFORM
// =============================================================================

/// GET /api/admin/schema
pub async fn get_schema(http_req: HttpRequest) -> Result<impl Responder, ApiError> {
    http_req.require_admin()?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(export_schema()))
}

/// POST /api/admin/notifications/dispatch
pub async fn dispatch_notification(
    service: web::Data<NotificationService>,
    http_req: HttpRequest,
    req: web::Json<DispatchNotificationRequest>,
) -> Result<impl Responder, ApiError> {
    let claims = http_req.require_admin()?;

    info!(
        kind = ?req.kind,
        send_email = req.send_email,
        admin = %claims.sub,
        "Dispatching notification"
    );

    let summary = service.dispatch(req.into_inner()).await?;

    Ok(HttpResponse::Ok().json(summary))
}

// =============================================================================
// ROUTE CONFIGURATION
// =============================================================================

pub fn configure_routes(cfg: &mut web::ServiceConfig, jwt: &JwtService) {
    cfg.service(
        web::scope("/api/admin")
            .wrap(AuthMiddleware::new(jwt.clone()))
            .route("/schema", web::get().to(get_schema))
            .route("/notifications/dispatch", web::post().to(dispatch_notification))
            .route("/tournaments/{id}/balance", web::post().to(balance_tournament))
            .route("/tournaments/{id}/bracket/repair", web::post().to(repair_bracket))
            .route("/tournaments/{id}/bracket/reset", web::post().to(reset_bracket))
            .route("/tournaments/{id}/members/reset", web::post().to(reset_members)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{JwtConfig, ADMIN_ROLE};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    const SECRET: &str = "admin_handler_test_secret";

    fn jwt() -> JwtService {
        JwtService::new(JwtConfig::new(SECRET))
    }

    #[actix_web::test]
    async fn test_destructive_request_needs_confirm_or_dry_run() {
        assert!(DestructiveRequest::default().check().is_err());
        assert!(DestructiveRequest { confirm: true, dry_run: false }.check().is_ok());
        assert!(DestructiveRequest { confirm: false, dry_run: true }.check().is_ok());
    }

    #[actix_web::test]
    async fn test_schema_for_admin_only() {
        let jwt = jwt();
        let admin = jwt
            .generate_access_token(Uuid::new_v4(), vec![ADMIN_ROLE.to_string()])
            .unwrap();
        let player = jwt.generate_access_token(Uuid::new_v4(), vec![]).unwrap();
        let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, &jwt))).await;

        let req = test::TestRequest::get()
            .uri("/api/admin/schema")
            .insert_header(("Authorization", format!("Bearer {}", admin)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert!(String::from_utf8_lossy(&body).contains("CREATE TABLE"));

        let req = test::TestRequest::get()
            .uri("/api/admin/schema")
            .insert_header(("Authorization", format!("Bearer {}", player)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_reset_without_confirm_is_rejected() {
        let jwt = jwt();
        let admin = jwt
            .generate_access_token(Uuid::new_v4(), vec![ADMIN_ROLE.to_string()])
            .unwrap();
        // Never connected: the request is rejected before any query runs.
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/valtourney_test").unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(BracketService::new(pool)))
                .configure(|cfg| configure_routes(cfg, &jwt)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/tournaments/{}/bracket/reset", Uuid::new_v4()))
            .insert_header(("Authorization", format!("Bearer {}", admin)))
            .set_json(serde_json::json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
