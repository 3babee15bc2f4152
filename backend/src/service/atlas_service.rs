//! ATLAS: weight-based assignment of players to any number of teams.
//!
//! Elite players are dealt out round-robin first so no team stacks them;
//! everyone else then joins whichever open team has the lowest running total.
//! [`validate_assignment`] grades a result without changing it.

use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::player::{StreamlinedPlayer, TeamData};
use crate::models::tournament::{
    BalancedTeamsResponse, PersistedTeam, SignupPlayer, Tournament, TournamentStatus,
};
use crate::service::player_service::evidence_weight;
use crate::service::team_balancer::BalanceError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Scores at or above this are reported as balanced.
pub const BALANCED_SCORE: u8 = 70;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasOptions {
    pub team_count: usize,
    pub team_size: usize,
    pub elite_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasAssignment {
    pub teams: Vec<TeamData>,
    /// Players beyond team capacity, strongest first.
    pub substitutes: Vec<StreamlinedPlayer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOptions {
    pub elite_threshold: u32,
    pub spread_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceQuality {
    pub score: u8,
    pub is_balanced: bool,
    pub weight_spread: u32,
    pub team_totals: Vec<u32>,
    pub recommendations: Vec<String>,
}

pub fn assign_teams(
    players: &[StreamlinedPlayer],
    options: &AtlasOptions,
) -> Result<AtlasAssignment, BalanceError> {
    if options.team_count < 2 {
        return Err(BalanceError::InvalidTeamShape(format!(
            "at least 2 teams required, got {}",
            options.team_count
        )));
    }
    if options.team_size == 0 {
        return Err(BalanceError::InvalidTeamShape(
            "team size must be positive".to_string(),
        ));
    }

    let capacity = options
        .team_count
        .checked_mul(options.team_size)
        .ok_or_else(|| {
            BalanceError::InvalidTeamShape(format!(
                "{} teams of {} is too large",
                options.team_count, options.team_size
            ))
        })?;
    // Also rules out more teams than players before any team is allocated.
    if players.len() < capacity {
        return Err(BalanceError::InsufficientPlayers {
            required: capacity,
            actual: players.len(),
            team_count: options.team_count,
            team_size: options.team_size,
        });
    }

    let mut sorted = players.to_vec();
    sorted.sort_by(|a, b| b.weight.cmp(&a.weight));
    let substitutes = sorted.split_off(capacity);

    let mut teams: Vec<TeamData> = (1..=options.team_count)
        .map(|n| TeamData::new(format!("Team {}", n)))
        .collect();

    let (elites, others): (Vec<_>, Vec<_>) = sorted
        .into_iter()
        .partition(|p| p.is_elite(options.elite_threshold));

    for (i, player) in elites.into_iter().enumerate() {
        // Round-robin, stepping past teams that are already full.
        let target = (0..options.team_count)
            .map(|offset| (i + offset) % options.team_count)
            .find(|&t| teams[t].players.len() < options.team_size);
        if let Some(t) = target {
            teams[t].push(player, options.elite_threshold);
        }
    }

    for player in others {
        let target = teams
            .iter()
            .enumerate()
            .filter(|(_, t)| t.players.len() < options.team_size)
            .min_by_key(|(i, t)| (t.total_weight, *i))
            .map(|(i, _)| i);
        if let Some(t) = target {
            teams[t].push(player, options.elite_threshold);
        }
    }

    Ok(AtlasAssignment { teams, substitutes })
}

pub fn validate_assignment(teams: &[TeamData], options: &ValidationOptions) -> BalanceQuality {
    let team_totals: Vec<u32> = teams.iter().map(|t| t.total_weight).collect();
    let max_total = team_totals.iter().copied().max().unwrap_or(0);
    let min_total = team_totals.iter().copied().min().unwrap_or(0);
    let weight_spread = max_total - min_total;

    let mut penalty: u32 = 0;
    let mut recommendations = Vec::new();

    if weight_spread > options.spread_threshold {
        penalty += (10 + (weight_spread - options.spread_threshold) / 5).min(50);

        let strongest = teams.iter().max_by_key(|t| t.total_weight);
        let weakest = teams.iter().min_by_key(|t| t.total_weight);
        if let (Some(strong), Some(weak)) = (strongest, weakest) {
            recommendations.push(format!(
                "Weight spread of {} exceeds {}: consider swapping a player from {} ({}) with one from {} ({})",
                weight_spread,
                options.spread_threshold,
                strong.name,
                strong.total_weight,
                weak.name,
                weak.total_weight
            ));
        }
    }

    for team in teams {
        let elites = team
            .players
            .iter()
            .filter(|p| p.is_elite(options.elite_threshold))
            .count();
        if elites > 1 {
            penalty += 20 * (elites as u32 - 1);
            recommendations.push(format!(
                "{} has {} elite players: move {} to another team",
                team.name,
                elites,
                elites - 1
            ));
        }
    }

    let score = 100u32.saturating_sub(penalty) as u8;

    BalanceQuality {
        score,
        is_balanced: score >= BALANCED_SCORE,
        weight_spread,
        team_totals,
        recommendations,
    }
}

fn streamlined(signup: &SignupPlayer) -> StreamlinedPlayer {
    StreamlinedPlayer {
        id: signup.user_id,
        display_name: signup.username.clone(),
        rank: signup.current_rank.clone(),
        weight: evidence_weight(signup.into()).weight,
    }
}

/// Teams a tournament can field from its signups, capped at `max_teams`.
pub fn tournament_team_count(
    signups: usize,
    team_size: usize,
    max_teams: i32,
) -> Result<usize, BalanceError> {
    if team_size == 0 {
        return Err(BalanceError::InvalidTeamShape(
            "team size must be positive".to_string(),
        ));
    }
    Ok((signups / team_size).min(max_teams.max(0) as usize))
}

/// Balances a tournament's solo signups into persisted teams.
#[derive(Clone)]
pub struct AtlasService {
    db_pool: DbPool,
    elite_threshold: u32,
    spread_threshold: u32,
}

impl AtlasService {
    pub fn new(db_pool: DbPool, elite_threshold: u32, spread_threshold: u32) -> Self {
        Self {
            db_pool,
            elite_threshold,
            spread_threshold,
        }
    }

    pub async fn balance_tournament(
        &self,
        tournament_id: Uuid,
        team_size: usize,
    ) -> Result<BalancedTeamsResponse, ApiError> {
        let tournament = sqlx::query_as::<_, Tournament>("SELECT * FROM tournaments WHERE id = $1")
            .bind(tournament_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Tournament not found"))?;

        if matches!(
            tournament.status,
            TournamentStatus::Live | TournamentStatus::Completed | TournamentStatus::Cancelled
        ) {
            return Err(ApiError::conflict(format!(
                "Cannot balance a tournament that is {}",
                tournament.status
            )));
        }

        let (match_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM matches WHERE tournament_id = $1")
                .bind(tournament_id)
                .fetch_one(&self.db_pool)
                .await?;
        if match_count > 0 {
            return Err(ApiError::conflict(
                "Bracket already generated; reset it before rebalancing",
            ));
        }

        let signups = sqlx::query_as::<_, SignupPlayer>(
            r#"
            SELECT u.id AS user_id, u.username, u.current_rank, u.peak_rank,
                   u.manual_weight_override, u.tournaments_won
            FROM tournament_signups s
            JOIN users u ON u.id = s.user_id
            WHERE s.tournament_id = $1
            ORDER BY s.created_at ASC
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.db_pool)
        .await?;

        let team_count = tournament_team_count(signups.len(), team_size, tournament.max_teams)?;
        let players: Vec<StreamlinedPlayer> = signups.iter().map(streamlined).collect();

        let assignment = assign_teams(
            &players,
            &AtlasOptions {
                team_count,
                team_size,
                elite_threshold: self.elite_threshold,
            },
        )?;
        let quality = validate_assignment(
            &assignment.teams,
            &ValidationOptions {
                elite_threshold: self.elite_threshold,
                spread_threshold: self.spread_threshold,
            },
        );

        if !quality.is_balanced {
            warn!(
                tournament_id = %tournament_id,
                score = quality.score,
                spread = quality.weight_spread,
                "Tournament teams are below the balance target"
            );
        }

        // Strongest team gets seed 1.
        let mut seeded: Vec<&TeamData> = assignment.teams.iter().collect();
        seeded.sort_by(|a, b| b.total_weight.cmp(&a.total_weight));

        let mut tx = self.db_pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM team_members
            WHERE team_id IN (SELECT id FROM teams WHERE tournament_id = $1 AND is_auto_generated)
            "#,
        )
        .bind(tournament_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM teams WHERE tournament_id = $1 AND is_auto_generated")
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?;

        let mut persisted = Vec::with_capacity(seeded.len());
        for (i, team) in seeded.into_iter().enumerate() {
            let team_id = Uuid::new_v4();
            let seed = i as i32 + 1;
            // Players are stored strongest first.
            let captain_id = team.players.first().map(|p| p.id);

            sqlx::query(
                r#"
                INSERT INTO teams (id, tournament_id, name, seed, captain_id, total_weight, is_auto_generated)
                VALUES ($1, $2, $3, $4, $5, $6, TRUE)
                "#,
            )
            .bind(team_id)
            .bind(tournament_id)
            .bind(&team.name)
            .bind(seed)
            .bind(captain_id)
            .bind(team.total_weight as i32)
            .execute(&mut *tx)
            .await?;

            let user_ids: Vec<Uuid> = team.players.iter().map(|p| p.id).collect();
            let captains: Vec<bool> = team.players.iter().map(|p| Some(p.id) == captain_id).collect();

            sqlx::query(
                r#"
                INSERT INTO team_members (team_id, user_id, is_captain)
                SELECT $1, m.user_id, m.is_captain
                FROM UNNEST($2::uuid[], $3::bool[]) AS m(user_id, is_captain)
                "#,
            )
            .bind(team_id)
            .bind(&user_ids)
            .bind(&captains)
            .execute(&mut *tx)
            .await?;

            persisted.push(PersistedTeam {
                team_id,
                name: team.name.clone(),
                seed,
                total_weight: team.total_weight,
                players: team.players.clone(),
            });
        }

        if tournament.status == TournamentStatus::RegistrationOpen {
            sqlx::query("UPDATE tournaments SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(TournamentStatus::Balancing)
                .bind(tournament_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(
            tournament_id = %tournament_id,
            teams = persisted.len(),
            substitutes = assignment.substitutes.len(),
            score = quality.score,
            "Tournament teams balanced"
        );

        Ok(BalancedTeamsResponse {
            tournament_id,
            teams: persisted,
            substitutes: assignment.substitutes,
            quality,
        })
    }
}
