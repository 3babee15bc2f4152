use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::match_model::{BracketMatch, MatchStatus, ReportResultRequest};
use crate::models::tournament::{Tournament, TournamentStatus};
use crate::service::bracket_calculations::{
    calculate_bracket_structure, generate_single_elimination, next_slot, validate_progression,
    BracketStructure, ProgressionIssue,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct BracketView {
    pub tournament_id: Uuid,
    pub structure: Option<BracketStructure>,
    pub matches: Vec<BracketMatch>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RepairSummary {
    pub checked: usize,
    pub fixes_applied: usize,
    pub errors: usize,
    pub issues: Vec<ProgressionIssue>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BracketResetSummary {
    pub tournament_id: Uuid,
    pub dry_run: bool,
    pub matches_deleted: u64,
    pub matches_created: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MemberResetSummary {
    pub tournament_id: Uuid,
    pub dry_run: bool,
    pub teams_affected: u64,
    pub members_deleted: u64,
}

/// Bracket reads, result reporting and the admin repair tools.
pub struct BracketService {
    db_pool: DbPool,
}

impl BracketService {
    pub fn new(db_pool: DbPool) -> Self {
        Self { db_pool }
    }

    async fn get_tournament(&self, tournament_id: Uuid) -> Result<Tournament, ApiError> {
        sqlx::query_as::<_, Tournament>("SELECT * FROM tournaments WHERE id = $1")
            .bind(tournament_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Tournament not found"))
    }

    async fn team_count(&self, tournament_id: Uuid) -> Result<usize, ApiError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM teams WHERE tournament_id = $1")
            .bind(tournament_id)
            .fetch_one(&self.db_pool)
            .await?;
        Ok(count.max(0) as usize)
    }

    async fn load_matches(&self, tournament_id: Uuid) -> Result<Vec<BracketMatch>, ApiError> {
        let matches = sqlx::query_as::<_, BracketMatch>(
            r#"
            SELECT * FROM matches
            WHERE tournament_id = $1
            ORDER BY round_number ASC, match_number ASC
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(matches)
    }

    /// Structure of the tournament's bracket, `None` while it has fewer than
    /// two teams.
    pub async fn structure_for(&self, tournament_id: Uuid) -> Result<Option<BracketStructure>, ApiError> {
        let teams = self.team_count(tournament_id).await?;
        Ok(calculate_bracket_structure(teams).ok())
    }

    pub async fn get_bracket(&self, tournament_id: Uuid) -> Result<BracketView, ApiError> {
        self.get_tournament(tournament_id).await?;
        let structure = self.structure_for(tournament_id).await?;
        let matches = self.load_matches(tournament_id).await?;

        Ok(BracketView {
            tournament_id,
            structure,
            matches,
        })
    }

    // =============================================================================
    // PROGRESSION
    // =============================================================================

    /// Read-only progression check.
    pub async fn validate(&self, tournament_id: Uuid) -> Result<RepairSummary, ApiError> {
        self.get_tournament(tournament_id).await?;
        let teams = self.team_count(tournament_id).await?;
        let matches = self.load_matches(tournament_id).await?;
        let report = validate_progression(&matches, teams)?;

        Ok(RepairSummary {
            checked: report.checked,
            issues: report.issues,
            ..Default::default()
        })
    }

    /// Validates the bracket and writes each slot correction directly. A
    /// failed update is counted and the pass carries on with the next fix.
    pub async fn repair_progression(&self, tournament_id: Uuid) -> Result<RepairSummary, ApiError> {
        self.get_tournament(tournament_id).await?;
        let teams = self.team_count(tournament_id).await?;
        let matches = self.load_matches(tournament_id).await?;
        let report = validate_progression(&matches, teams)?;

        let mut summary = RepairSummary {
            checked: report.checked,
            issues: report.issues,
            ..Default::default()
        };

        for fix in &report.fixes {
            let result = sqlx::query(&format!(
                "UPDATE matches SET {} = $1, updated_at = NOW() WHERE id = $2",
                fix.slot.column()
            ))
            .bind(fix.team_id)
            .bind(fix.match_id)
            .execute(&self.db_pool)
            .await;

            match result {
                Ok(_) => summary.fixes_applied += 1,
                Err(e) => {
                    summary.errors += 1;
                    error!(
                        match_id = %fix.match_id,
                        slot = fix.slot.column(),
                        error = %e,
                        "Failed to apply bracket fix"
                    );
                }
            }
        }

        info!(
            tournament_id = %tournament_id,
            checked = summary.checked,
            issues = summary.issues.len(),
            fixes_applied = summary.fixes_applied,
            errors = summary.errors,
            "Bracket progression repaired"
        );

        Ok(summary)
    }

    /// Records a match result and advances the winner. Reporting the same
    /// winner again returns the stored match unchanged.
    pub async fn report_result(
        &self,
        match_id: Uuid,
        request: &ReportResultRequest,
    ) -> Result<BracketMatch, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let current = sqlx::query_as::<_, BracketMatch>("SELECT * FROM matches WHERE id = $1 FOR UPDATE")
            .bind(match_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Match not found"))?;

        if !current.has_team(request.winner_id) {
            return Err(ApiError::bad_request("Winner is not a team in this match"));
        }
        if current.is_completed() {
            if current.winner_id == Some(request.winner_id) {
                return Ok(current);
            }
            return Err(ApiError::conflict("Match already completed with a different winner"));
        }
        if current.team1_id.is_none() || current.team2_id.is_none() {
            return Err(ApiError::conflict("Match is still waiting for an opponent"));
        }

        let updated = sqlx::query_as::<_, BracketMatch>(
            r#"
            UPDATE matches
            SET winner_id = $1, team1_score = $2, team2_score = $3, status = $4,
                completed_at = NOW(), updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(request.winner_id)
        .bind(request.team1_score)
        .bind(request.team2_score)
        .bind(MatchStatus::Completed)
        .bind(match_id)
        .fetch_one(&mut *tx)
        .await?;

        let (team_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM teams WHERE tournament_id = $1")
            .bind(updated.tournament_id)
            .fetch_one(&mut *tx)
            .await?;
        let structure = calculate_bracket_structure(team_count.max(0) as usize)?;

        if updated.round_number < structure.total_rounds as i32 {
            let next = next_slot(updated.round_number, updated.match_number);
            let advanced = sqlx::query(&format!(
                r#"
                UPDATE matches SET {} = $1, updated_at = NOW()
                WHERE tournament_id = $2 AND round_number = $3 AND match_number = $4 AND status <> $5
                "#,
                next.slot.column()
            ))
            .bind(request.winner_id)
            .bind(updated.tournament_id)
            .bind(next.round)
            .bind(next.match_number)
            .bind(MatchStatus::Completed)
            .execute(&mut *tx)
            .await?;

            if advanced.rows_affected() == 0 {
                warn!(
                    match_id = %match_id,
                    next_round = next.round,
                    next_match = next.match_number,
                    "Winner could not be advanced; next match missing or already completed"
                );
            }

            sqlx::query("UPDATE tournaments SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3")
                .bind(TournamentStatus::Live)
                .bind(updated.tournament_id)
                .bind(TournamentStatus::Balancing)
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query(
                "UPDATE tournaments SET status = $1, winner_team_id = $2, updated_at = NOW() WHERE id = $3",
            )
            .bind(TournamentStatus::Completed)
            .bind(request.winner_id)
            .bind(updated.tournament_id)
            .execute(&mut *tx)
            .await?;

            info!(
                tournament_id = %updated.tournament_id,
                winner_id = %request.winner_id,
                "Tournament completed"
            );
        }

        tx.commit().await?;

        info!(
            match_id = %match_id,
            round = updated.round_number,
            winner_id = %request.winner_id,
            "Match result reported"
        );

        Ok(updated)
    }

    // =============================================================================
    // ADMIN RESETS
    // =============================================================================

    /// Deletes every match of the tournament and regenerates the bracket from
    /// its seeded teams in one transaction.
    pub async fn reset_bracket(
        &self,
        tournament_id: Uuid,
        dry_run: bool,
    ) -> Result<BracketResetSummary, ApiError> {
        self.get_tournament(tournament_id).await?;

        let team_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM teams
            WHERE tournament_id = $1
            ORDER BY seed ASC NULLS LAST, created_at ASC
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.db_pool)
        .await?;

        let planned = generate_single_elimination(&team_ids)?;

        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM matches WHERE tournament_id = $1")
            .bind(tournament_id)
            .fetch_one(&self.db_pool)
            .await?;

        if dry_run {
            return Ok(BracketResetSummary {
                tournament_id,
                dry_run,
                matches_deleted: existing.max(0) as u64,
                matches_created: planned.len() as u64,
            });
        }

        let mut tx = self.db_pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM matches WHERE tournament_id = $1")
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for m in &planned {
            sqlx::query(
                r#"
                INSERT INTO matches (
                    id, tournament_id, round_number, match_number,
                    team1_id, team2_id, winner_id, status, completed_at
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9
                )
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(tournament_id)
            .bind(m.round_number)
            .bind(m.match_number)
            .bind(m.team1_id)
            .bind(m.team2_id)
            .bind(m.winner_id)
            .bind(m.status)
            .bind((m.status == MatchStatus::Completed).then(Utc::now))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE tournaments
            SET winner_team_id = NULL,
                status = CASE WHEN status = 'completed'::tournament_status
                              THEN 'live'::tournament_status ELSE status END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(tournament_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            tournament_id = %tournament_id,
            matches_deleted = deleted,
            matches_created = planned.len(),
            "Bracket reset"
        );

        Ok(BracketResetSummary {
            tournament_id,
            dry_run,
            matches_deleted: deleted,
            matches_created: planned.len() as u64,
        })
    }

    /// Removes every member from every team of the tournament.
    pub async fn reset_team_members(
        &self,
        tournament_id: Uuid,
        dry_run: bool,
    ) -> Result<MemberResetSummary, ApiError> {
        self.get_tournament(tournament_id).await?;

        let (teams, members): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT t.id), COUNT(m.user_id)
            FROM teams t
            LEFT JOIN team_members m ON m.team_id = t.id
            WHERE t.tournament_id = $1
            "#,
        )
        .bind(tournament_id)
        .fetch_one(&self.db_pool)
        .await?;

        if dry_run {
            return Ok(MemberResetSummary {
                tournament_id,
                dry_run,
                teams_affected: teams.max(0) as u64,
                members_deleted: members.max(0) as u64,
            });
        }

        let mut tx = self.db_pool.begin().await?;

        let deleted = sqlx::query(
            "DELETE FROM team_members WHERE team_id IN (SELECT id FROM teams WHERE tournament_id = $1)",
        )
        .bind(tournament_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let affected = sqlx::query(
            "UPDATE teams SET captain_id = NULL, total_weight = 0 WHERE tournament_id = $1",
        )
        .bind(tournament_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        warn!(
            tournament_id = %tournament_id,
            members_deleted = deleted,
            teams_affected = affected,
            "Team members reset"
        );

        Ok(MemberResetSummary {
            tournament_id,
            dry_run,
            teams_affected: affected,
            members_deleted: deleted,
        })
    }
}
