use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::match_model::BracketMatch;
use crate::models::veto::*;
use crate::service::veto_engine::VetoEngine;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// Who is acting on a veto session.
#[derive(Debug, Clone, Copy)]
pub struct VetoActor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

pub struct VetoService {
    db_pool: DbPool,
}

impl VetoService {
    pub fn new(db_pool: DbPool) -> Self {
        Self { db_pool }
    }

    fn response(session: VetoSession, actions: Vec<VetoAction>, engine: &VetoEngine) -> VetoSessionResponse {
        VetoSessionResponse {
            session,
            actions,
            next_step: engine.next_step(),
            remaining_maps: engine.remaining_maps(),
            picked_maps: engine.picked_maps(),
        }
    }

    async fn load_actions<'e, E>(executor: E, session_id: Uuid) -> Result<Vec<VetoAction>, ApiError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let actions = sqlx::query_as::<_, VetoAction>(
            "SELECT * FROM map_veto_actions WHERE session_id = $1 ORDER BY order_number ASC",
        )
        .bind(session_id)
        .fetch_all(executor)
        .await?;
        Ok(actions)
    }

    pub async fn create_session(&self, request: CreateVetoSessionRequest) -> Result<VetoSessionResponse, ApiError> {
        request.validate()?;

        let bracket_match = sqlx::query_as::<_, BracketMatch>("SELECT * FROM matches WHERE id = $1")
            .bind(request.match_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Match not found"))?;

        if !bracket_match.has_team(request.home_team_id) || !bracket_match.has_team(request.away_team_id) {
            return Err(ApiError::bad_request("Both veto teams must play in the match"));
        }

        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM map_veto_sessions WHERE match_id = $1")
            .bind(request.match_id)
            .fetch_optional(&self.db_pool)
            .await?;
        if existing.is_some() {
            return Err(ApiError::conflict("Match already has a veto session"));
        }

        let map_pool = request
            .map_pool
            .unwrap_or_else(|| DEFAULT_MAP_POOL.iter().map(|m| m.to_string()).collect());
        let engine = VetoEngine::new(
            request.format,
            map_pool.clone(),
            request.home_team_id,
            request.away_team_id,
        )?;

        let session = sqlx::query_as::<_, VetoSession>(
            r#"
            INSERT INTO map_veto_sessions (
                id, match_id, format, status, home_team_id, away_team_id, map_pool, current_turn_team_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.match_id)
        .bind(request.format)
        .bind(VetoStatus::Pending)
        .bind(request.home_team_id)
        .bind(request.away_team_id)
        .bind(&map_pool)
        .bind(engine.current_turn_team())
        .fetch_one(&self.db_pool)
        .await?;

        info!(
            session_id = %session.id,
            match_id = %request.match_id,
            format = ?request.format,
            "Veto session created"
        );

        Ok(Self::response(session, Vec::new(), &engine))
    }

    pub async fn session_exists(&self, session_id: Uuid) -> Result<bool, ApiError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM map_veto_sessions WHERE id = $1)")
                .bind(session_id)
                .fetch_one(&self.db_pool)
                .await?;
        Ok(exists)
    }

    pub async fn get_session_with_actions(&self, session_id: Uuid) -> Result<VetoSessionResponse, ApiError> {
        let session = sqlx::query_as::<_, VetoSession>("SELECT * FROM map_veto_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Veto session not found"))?;

        let actions = Self::load_actions(&self.db_pool, session_id).await?;
        let engine = VetoEngine::from_session(&session, &actions)?;

        Ok(Self::response(session, actions, &engine))
    }

    /// Validates and records one team action under a row lock on the
    /// session, then records the decider if it became due.
    pub async fn perform_action(
        &self,
        session_id: Uuid,
        actor: VetoActor,
        request: PerformVetoActionRequest,
    ) -> Result<VetoSessionResponse, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let session = sqlx::query_as::<_, VetoSession>("SELECT * FROM map_veto_sessions WHERE id = $1 FOR UPDATE")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Veto session not found"))?;

        if request.team_id != session.home_team_id && request.team_id != session.away_team_id {
            return Err(ApiError::forbidden("Team is not part of this veto"));
        }

        if !actor.is_admin {
            let is_captain: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM team_members
                    WHERE team_id = $1 AND user_id = $2 AND is_captain
                )
                "#,
            )
            .bind(request.team_id)
            .bind(actor.user_id)
            .fetch_one(&mut *tx)
            .await?;

            if !is_captain {
                return Err(ApiError::forbidden("Only the team captain can veto"));
            }
        }

        let mut actions = Self::load_actions(&mut *tx, session_id).await?;
        let mut engine = VetoEngine::from_session(&session, &actions)?;

        let mut applied = vec![engine.apply(
            request.team_id,
            request.action_type,
            request.map_name.as_deref(),
            request.side,
        )?];
        applied.extend(engine.resolve_decider());

        for action in &applied {
            let stored = sqlx::query_as::<_, VetoAction>(
                r#"
                INSERT INTO map_veto_actions (id, session_id, order_number, action_type, team_id, map_name, side)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(session_id)
            .bind(action.order_number)
            .bind(action.action_type)
            .bind(action.team_id)
            .bind(&action.map_name)
            .bind(action.side)
            .fetch_one(&mut *tx)
            .await?;

            debug!(
                session_id = %session_id,
                order = stored.order_number,
                action = %stored.action_type,
                map = ?stored.map_name,
                "Veto action recorded"
            );
            actions.push(stored);
        }

        let status = engine.status();
        if !session.status.can_transition_to(&status) {
            return Err(ApiError::conflict(format!(
                "Invalid veto transition from {:?} to {:?}",
                session.status, status
            )));
        }

        let session = sqlx::query_as::<_, VetoSession>(
            r#"
            UPDATE map_veto_sessions
            SET status = $1,
                current_turn_team_id = $2,
                completed_at = CASE WHEN $3 THEN NOW() ELSE completed_at END
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(engine.current_turn_team())
        .bind(status.is_terminal())
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            session_id = %session_id,
            team_id = %request.team_id,
            action = %request.action_type,
            status = ?status,
            "Veto action performed"
        );

        Ok(Self::response(session, actions, &engine))
    }
}
