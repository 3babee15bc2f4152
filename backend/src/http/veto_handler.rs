use crate::api_error::ApiError;
use crate::auth::{AuthMiddleware, ClaimsExt, JwtService};
use crate::models::veto::{CreateVetoSessionRequest, PerformVetoActionRequest};
use crate::service::veto_service::{VetoActor, VetoService};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use tracing::info;
use uuid::Uuid;

// =============================================================================
// CREATE SESSION
// =============================================================================

/// POST /api/veto
/// Open a veto session for a match (admin only)
pub async fn create_session(
    service: web::Data<VetoService>,
    http_req: HttpRequest,
    req: web::Json<CreateVetoSessionRequest>,
) -> Result<impl Responder, ApiError> {
    http_req.require_admin()?;

    info!(
        match_id = %req.match_id,
        format = ?req.format,
        "Received create veto session request"
    );

    let session = service.create_session(req.into_inner()).await?;

    Ok(HttpResponse::Created().json(session))
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// GET /api/veto/:session_id
/// Session, recorded actions and the next expected step
pub async fn get_session(
    service: web::Data<VetoService>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let session = service.get_session_with_actions(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(session))
}

// =============================================================================
// PERFORM ACTION
// =============================================================================

/// POST /api/veto/:session_id/actions
/// Ban, pick or choose a side for the team whose turn it is
pub async fn perform_action(
    service: web::Data<VetoService>,
    http_req: HttpRequest,
    path: web::Path<Uuid>,
    req: web::Json<PerformVetoActionRequest>,
) -> Result<impl Responder, ApiError> {
    let session_id = path.into_inner();
    let claims = http_req.claims().ok_or(ApiError::Unauthorized)?;
    let actor = VetoActor {
        user_id: claims.user_id().map_err(|_| ApiError::Unauthorized)?,
        is_admin: claims.is_admin(),
    };

    info!(
        session_id = %session_id,
        team_id = %req.team_id,
        action = %req.action_type,
        map = ?req.map_name,
        "Received veto action"
    );

    let session = service
        .perform_action(session_id, actor, req.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(session))
}

// =============================================================================
// ROUTE CONFIGURATION
// =============================================================================

pub fn configure_routes(cfg: &mut web::ServiceConfig, jwt: &JwtService) {
    cfg.service(
        web::scope("/api/veto")
            .service(
                web::resource("")
                    .wrap(AuthMiddleware::new(jwt.clone()))
                    .route(web::post().to(create_session)),
            )
            .route("/{session_id}", web::get().to(get_session))
            .service(
                web::resource("/{session_id}/actions")
                    .wrap(AuthMiddleware::new(jwt.clone()))
                    .route(web::post().to(perform_action)),
            ),
    );
}
