use crate::api_error::ApiError;
use crate::http::bracket_handler;
use crate::models::tournament::TournamentStatus;
use crate::service::tournament_service::TournamentService;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListTournamentsQuery {
    pub status: Option<TournamentStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// GET /api/tournaments
pub async fn list_tournaments(
    service: web::Data<TournamentService>,
    query: web::Query<ListTournamentsQuery>,
) -> Result<impl Responder, ApiError> {
    let query = query.into_inner();
    let result = service
        .list_tournaments(query.status, query.page, query.per_page)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/tournaments/:id
pub async fn get_tournament(
    service: web::Data<TournamentService>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let tournament = service.get_tournament(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tournament))
}

/// GET /api/tournaments/:id/teams
/// Teams with their members and weights
pub async fn list_teams(
    service: web::Data<TournamentService>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let teams = service.list_teams(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(teams))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tournaments")
            .route("", web::get().to(list_tournaments))
            .route("/{id}", web::get().to(get_tournament))
            .route("/{id}/teams", web::get().to(list_teams))
            .route("/{id}/bracket", web::get().to(bracket_handler::get_bracket))
            .route("/{id}/bracket/validate", web::get().to(bracket_handler::validate_bracket)),
    );
}
