use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::tournament::*;
use std::collections::HashMap;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Clamps 1-based paging input to sane bounds.
pub fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, per_page)
}

/// Row offset for a page from [`page_bounds`]; saturates instead of overflowing.
pub fn page_offset(page: i64, per_page: i64) -> i64 {
    page.saturating_sub(1).saturating_mul(per_page)
}

#[derive(Clone)]
pub struct TournamentService {
    db_pool: DbPool,
}

impl TournamentService {
    pub fn new(db_pool: DbPool) -> Self {
        Self { db_pool }
    }

    pub async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<TournamentListResponse, ApiError> {
        let (page, per_page) = page_bounds(page, per_page);

        let tournaments = sqlx::query_as::<_, Tournament>(
            r#"
            SELECT * FROM tournaments
            WHERE ($1::tournament_status IS NULL OR status = $1)
            ORDER BY start_time ASC NULLS LAST, created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(per_page)
        .bind(page_offset(page, per_page))
        .fetch_all(&self.db_pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tournaments WHERE ($1::tournament_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(TournamentListResponse {
            tournaments,
            total,
            page,
            per_page,
        })
    }

    /// Tournaments players can still join or follow, soonest first.
    pub async fn list_open(&self, limit: i64) -> Result<Vec<Tournament>, ApiError> {
        let tournaments = sqlx::query_as::<_, Tournament>(
            r#"
            SELECT * FROM tournaments
            WHERE status IN ('registration_open', 'balancing', 'live')
            ORDER BY start_time ASC NULLS LAST
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(tournaments)
    }

    pub async fn get_tournament(&self, tournament_id: Uuid) -> Result<Tournament, ApiError> {
        sqlx::query_as::<_, Tournament>("SELECT * FROM tournaments WHERE id = $1")
            .bind(tournament_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Tournament not found"))
    }

    pub async fn list_teams(&self, tournament_id: Uuid) -> Result<Vec<TeamWithMembers>, ApiError> {
        self.get_tournament(tournament_id).await?;

        let teams = sqlx::query_as::<_, Team>(
            r#"
            SELECT * FROM teams
            WHERE tournament_id = $1
            ORDER BY seed ASC NULLS LAST, created_at ASC
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.db_pool)
        .await?;

        let members = sqlx::query_as::<_, TeamMemberView>(
            r#"
            SELECT m.team_id, m.user_id, u.username, u.current_rank, u.weight_rating, m.is_captain
            FROM team_members m
            JOIN teams t ON t.id = m.team_id
            JOIN users u ON u.id = m.user_id
            WHERE t.tournament_id = $1
            ORDER BY m.is_captain DESC, u.weight_rating DESC
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.db_pool)
        .await?;

        let mut by_team: HashMap<Uuid, Vec<TeamMemberView>> = HashMap::new();
        for member in members {
            by_team.entry(member.team_id).or_default().push(member);
        }

        Ok(teams
            .into_iter()
            .map(|team| {
                let members = by_team.remove(&team.id).unwrap_or_default();
                TeamWithMembers { team, members }
            })
            .collect())
    }
}
