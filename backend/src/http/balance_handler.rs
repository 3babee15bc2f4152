use crate::api_error::ApiError;
use crate::config::BalancingConfig;
use crate::models::player::{BalancerPlayer, StreamlinedPlayer, TeamData};
use crate::service::atlas_service::{
    assign_teams, validate_assignment, AtlasAssignment, AtlasOptions, BalanceQuality, ValidationOptions,
};
use crate::service::team_balancer::balance_quick_match_teams;
use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// QUICK MATCH
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct QuickMatchBalanceRequest {
    pub players: Vec<BalancerPlayer>,
}

/// POST /api/balance/quick-match
/// Split ten weighted players into two teams of five
pub async fn balance_quick_match(
    config: web::Data<BalancingConfig>,
    req: web::Json<QuickMatchBalanceRequest>,
) -> Result<impl Responder, ApiError> {
    info!(players = req.players.len(), "Received quick match balance request");

    let result = balance_quick_match_teams(&req.players, config.confidence_threshold)?;

    Ok(HttpResponse::Ok().json(result))
}

// =============================================================================
// ATLAS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AtlasRequest {
    pub players: Vec<StreamlinedPlayer>,
    pub team_count: usize,
    #[serde(default = "default_team_size")]
    pub team_size: usize,
    pub elite_threshold: Option<u32>,
    pub spread_threshold: Option<u32>,
}

fn default_team_size() -> usize {
    5
}

#[derive(Debug, Serialize)]
pub struct AtlasResponse {
    #[serde(flatten)]
    pub assignment: AtlasAssignment,
    pub quality: BalanceQuality,
}

/// POST /api/balance/atlas
/// Distribute players across N teams and grade the result
pub async fn balance_atlas(
    config: web::Data<BalancingConfig>,
    req: web::Json<AtlasRequest>,
) -> Result<impl Responder, ApiError> {
    let req = req.into_inner();
    info!(
        players = req.players.len(),
        team_count = req.team_count,
        team_size = req.team_size,
        "Received ATLAS balance request"
    );

    let elite_threshold = req.elite_threshold.unwrap_or(config.elite_threshold);
    let assignment = assign_teams(
        &req.players,
        &AtlasOptions {
            team_count: req.team_count,
            team_size: req.team_size,
            elite_threshold,
        },
    )?;
    let quality = validate_assignment(
        &assignment.teams,
        &ValidationOptions {
            elite_threshold,
            spread_threshold: req.spread_threshold.unwrap_or(config.spread_threshold),
        },
    );

    Ok(HttpResponse::Ok().json(AtlasResponse { assignment, quality }))
}

#[derive(Debug, Deserialize)]
pub struct ValidateTeamsRequest {
    pub teams: Vec<TeamData>,
    pub elite_threshold: Option<u32>,
    pub spread_threshold: Option<u32>,
}

/// POST /api/balance/atlas/validate
/// Grade an existing set of teams without changing it
pub async fn validate_atlas(
    config: web::Data<BalancingConfig>,
    req: web::Json<ValidateTeamsRequest>,
) -> Result<impl Responder, ApiError> {
    if req.teams.is_empty() {
        return Err(ApiError::bad_request("At least one team is required"));
    }

    let quality = validate_assignment(
        &req.teams,
        &ValidationOptions {
            elite_threshold: req.elite_threshold.unwrap_or(config.elite_threshold),
            spread_threshold: req.spread_threshold.unwrap_or(config.spread_threshold),
        },
    );

    Ok(HttpResponse::Ok().json(quality))
}

// =============================================================================
// ROUTE CONFIGURATION
// =============================================================================

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/balance")
            .route("/quick-match", web::post().to(balance_quick_match))
            .route("/atlas", web::post().to(balance_atlas))
            .route("/atlas/validate", web::post().to(validate_atlas)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use uuid::Uuid;

    fn players(weights: &[u32]) -> Vec<serde_json::Value> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| {
                serde_json::json!({
                    "id": Uuid::new_v4(),
                    "display_name": format!("p{}", i),
                    "rank": null,
                    "evidence_weight": w,
                    "weight": w
                })
            })
            .collect()
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(BalancingConfig::default()))
                    .configure(configure_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_quick_match_scenario() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/api/balance/quick-match")
            .set_json(serde_json::json!({
                "players": players(&[500, 450, 400, 350, 300, 250, 200, 150, 100, 50])
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["team_a_total"], 1400);
        assert_eq!(body["team_b_total"], 1350);
        assert_eq!(body["weight_delta"], 50);
        assert_eq!(body["team_a"].as_array().unwrap().len(), 5);
    }

    #[actix_web::test]
    async fn test_quick_match_rejects_wrong_count() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/api/balance/quick-match")
            .set_json(serde_json::json!({ "players": players(&[100; 9]) }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_atlas_returns_teams_and_quality() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/api/balance/atlas")
            .set_json(serde_json::json!({
                "players": players(&[500, 450, 300, 250, 200, 150, 100, 90, 80, 70, 60]),
                "team_count": 2
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["teams"].as_array().unwrap().len(), 2);
        assert_eq!(body["substitutes"].as_array().unwrap().len(), 1);
        assert!(body["quality"]["score"].as_u64().unwrap() <= 100);
    }

    #[actix_web::test]
    async fn test_validate_flags_stacked_team() {
        let app = app!();
        let stacked = serde_json::json!({
            "name": "Stacked",
            "players": players(&[500, 450, 400]),
            "total_weight": 1350,
            "elite_count": 3
        });
        let weak = serde_json::json!({
            "name": "Weak",
            "players": players(&[100, 90, 80]),
            "total_weight": 270,
            "elite_count": 0
        });
        let req = test::TestRequest::post()
            .uri("/api/balance/atlas/validate")
            .set_json(serde_json::json!({ "teams": [stacked, weak] }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["is_balanced"], false);
        assert_eq!(body["weight_spread"], 1080);
    }
}
