use crate::api_error::ApiError;
use crate::auth::{AuthMiddleware, ClaimsExt, JwtService};
use crate::models::match_model::ReportResultRequest;
use crate::service::bracket_calculations::calculate_bracket_structure;
use crate::service::bracket_service::BracketService;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct StructureQuery {
    #[validate(range(min = 2, max = 1024))]
    pub teams: usize,
}

/// GET /api/brackets/structure?teams=n
pub async fn get_structure(query: web::Query<StructureQuery>) -> Result<impl Responder, ApiError> {
    query.validate()?;
    let structure = calculate_bracket_structure(query.teams)?;
    Ok(HttpResponse::Ok().json(structure))
}

/// GET /api/tournaments/:id/bracket
pub async fn get_bracket(
    service: web::Data<BracketService>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let bracket = service.get_bracket(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(bracket))
}

/// GET /api/tournaments/:id/bracket/validate
/// Report progression problems without changing anything
pub async fn validate_bracket(
    service: web::Data<BracketService>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let report = service.validate(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// POST /api/matches/:id/result
/// Record a winner and advance them (admin only)
pub async fn report_result(
    service: web::Data<BracketService>,
    http_req: HttpRequest,
    path: web::Path<Uuid>,
    req: web::Json<ReportResultRequest>,
) -> Result<impl Responder, ApiError> {
    let claims = http_req.require_admin()?;
    req.validate()?;
    let match_id = path.into_inner();

    info!(
        match_id = %match_id,
        winner_id = %req.winner_id,
        admin = %claims.sub,
        "Received match result"
    );

    let updated = service.report_result(match_id, &req).await?;

    Ok(HttpResponse::Ok().json(updated))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, jwt: &JwtService) {
    cfg.route("/api/brackets/structure", web::get().to(get_structure))
        .service(
            web::resource("/api/matches/{id}/result")
                .wrap(AuthMiddleware::new(jwt.clone()))
                .route(web::post().to(report_result)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtConfig;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_structure_for_six_teams() {
        let jwt = JwtService::new(JwtConfig::new("bracket_test_secret"));
        let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, &jwt))).await;

        let req = test::TestRequest::get()
            .uri("/api/brackets/structure?teams=6")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["bracket_size"], 8);
        assert_eq!(body["total_rounds"], 3);
        assert_eq!(body["byes"], 2);
        assert_eq!(body["matches_per_round"], serde_json::json!([4, 2, 1]));
    }

    #[actix_web::test]
    async fn test_structure_rejects_single_team() {
        let jwt = JwtService::new(JwtConfig::new("bracket_test_secret"));
        let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, &jwt))).await;

        let req = test::TestRequest::get()
            .uri("/api/brackets/structure?teams=1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_structure_rejects_oversized_field() {
        let jwt = JwtService::new(JwtConfig::new("bracket_test_secret"));
        let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, &jwt))).await;

        for teams in ["1025", "18446744073709551615"] {
            let req = test::TestRequest::get()
                .uri(&format!("/api/brackets/structure?teams={}", teams))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[actix_web::test]
    async fn test_result_requires_token() {
        let jwt = JwtService::new(JwtConfig::new("bracket_test_secret"));
        let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, &jwt))).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/matches/{}/result", Uuid::new_v4()))
            .set_json(serde_json::json!({ "winner_id": Uuid::new_v4() }))
            .to_request();
        let status = match test::try_call_service(&app, req).await {
            Ok(resp) => resp.status(),
            Err(e) => e.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
