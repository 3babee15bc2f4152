use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::player::{BalancerPlayer, EvidenceWeight, PlayerProfile, WeightSource};
use crate::models::rank::{canonical_rank, rank_points};
use crate::models::tournament::SignupPlayer;
use tracing::info;
use uuid::Uuid;

/// Points added per tournament win, and the cap on that bonus.
pub const TOURNAMENT_WIN_BONUS: u32 = 15;
pub const MAX_TOURNAMENT_BONUS: u32 = 75;

/// Peak rank counts at 90% of its value.
const PEAK_RANK_PERCENT: u32 = 90;

/// The rank history a player's evidence weight is derived from.
#[derive(Debug, Clone, Copy)]
pub struct RankEvidence<'a> {
    pub current_rank: Option<&'a str>,
    pub peak_rank: Option<&'a str>,
    pub manual_override: Option<i32>,
    pub tournaments_won: i32,
}

impl<'a> From<&'a PlayerProfile> for RankEvidence<'a> {
    fn from(p: &'a PlayerProfile) -> Self {
        Self {
            current_rank: p.current_rank.as_deref(),
            peak_rank: p.peak_rank.as_deref(),
            manual_override: p.manual_weight_override,
            tournaments_won: p.tournaments_won,
        }
    }
}

impl<'a> From<&'a SignupPlayer> for RankEvidence<'a> {
    fn from(p: &'a SignupPlayer) -> Self {
        Self {
            current_rank: p.current_rank.as_deref(),
            peak_rank: p.peak_rank.as_deref(),
            manual_override: p.manual_weight_override,
            tournaments_won: p.tournaments_won,
        }
    }
}

pub fn evidence_weight(evidence: RankEvidence<'_>) -> EvidenceWeight {
    if let Some(manual) = evidence.manual_override {
        return EvidenceWeight {
            weight: manual.max(0) as u32,
            source: WeightSource::ManualOverride,
            tournament_bonus: 0,
        };
    }

    let current = rank_points(evidence.current_rank);
    let peak = evidence
        .peak_rank
        .map(|r| rank_points(Some(r)) * PEAK_RANK_PERCENT / 100)
        .unwrap_or(0);

    let (base, source) = if peak > current {
        (peak, WeightSource::PeakRank)
    } else {
        (current, WeightSource::CurrentRank)
    };

    let tournament_bonus =
        (evidence.tournaments_won.max(0) as u32 * TOURNAMENT_WIN_BONUS).min(MAX_TOURNAMENT_BONUS);

    EvidenceWeight {
        weight: base + tournament_bonus,
        source,
        tournament_bonus,
    }
}

pub fn balancer_player(profile: &PlayerProfile) -> BalancerPlayer {
    BalancerPlayer {
        id: profile.id,
        display_name: profile.username.clone(),
        rank: profile.current_rank.clone(),
        evidence_weight: evidence_weight(profile.into()).weight,
    }
}

const PROFILE_COLUMNS: &str = r#"
    id, discord_id, username, email, current_rank, peak_rank, weight_rating,
    manual_weight_override, tournaments_won, email_notifications, created_at, updated_at
"#;

#[derive(Clone)]
pub struct PlayerService {
    db_pool: DbPool,
}

impl PlayerService {
    pub fn new(db_pool: DbPool) -> Self {
        Self { db_pool }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<PlayerProfile, ApiError> {
        sqlx::query_as::<_, PlayerProfile>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Player not found"))
    }

    pub async fn get_profile_by_discord_id(
        &self,
        discord_id: &str,
    ) -> Result<Option<PlayerProfile>, ApiError> {
        let profile = sqlx::query_as::<_, PlayerProfile>(&format!(
            "SELECT {} FROM users WHERE discord_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(discord_id)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(profile)
    }

    /// Profiles for the given ids, in the order the ids were given.
    /// Profiles for the ids that exist, in input order.
    pub async fn find_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<PlayerProfile>, ApiError> {
        let rows = sqlx::query_as::<_, PlayerProfile>(&format!(
            "SELECT {} FROM users WHERE id = ANY($1)",
            PROFILE_COLUMNS
        ))
        .bind(user_ids)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(user_ids
            .iter()
            .filter_map(|id| rows.iter().find(|p| p.id == *id).cloned())
            .collect())
    }

    pub async fn get_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<PlayerProfile>, ApiError> {
        let found = self.find_profiles(user_ids).await?;

        user_ids
            .iter()
            .map(|id| {
                found
                    .iter()
                    .find(|p| p.id == *id)
                    .cloned()
                    .ok_or_else(|| ApiError::not_found(format!("Player {} not found", id)))
            })
            .collect()
    }

    /// Sets the player's current rank, raising the peak rank when the new
    /// rank is higher, and stores the recomputed evidence weight.
    pub async fn update_rank(&self, user_id: Uuid, rank: &str) -> Result<PlayerProfile, ApiError> {
        let canonical = canonical_rank(rank)
            .ok_or_else(|| ApiError::bad_request(format!("Unknown rank: {}", rank.trim())))?;

        let mut profile = self.get_profile(user_id).await?;
        let new_points = rank_points(Some(canonical));
        let peak_points = profile.peak_rank.as_deref().map(|r| rank_points(Some(r)));
        if profile.peak_rank.is_none() || peak_points.is_some_and(|p| new_points > p) {
            profile.peak_rank = Some(canonical.to_string());
        }
        profile.current_rank = Some(canonical.to_string());
        let weight = evidence_weight((&profile).into()).weight;

        let updated = sqlx::query_as::<_, PlayerProfile>(&format!(
            r#"
            UPDATE users
            SET current_rank = $1, peak_rank = $2, weight_rating = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(&profile.current_rank)
        .bind(&profile.peak_rank)
        .bind(weight as i32)
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await?;

        info!(user_id = %user_id, rank = canonical, weight, "Player rank updated");

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence<'a>(current: Option<&'a str>, peak: Option<&'a str>, wins: i32) -> RankEvidence<'a> {
        RankEvidence {
            current_rank: current,
            peak_rank: peak,
            manual_override: None,
            tournaments_won: wins,
        }
    }

    #[test]
    fn test_current_rank_weight() {
        let w = evidence_weight(evidence(Some("Gold 2"), Some("Gold 2"), 0));
        assert_eq!(w.weight, 80);
        assert_eq!(w.source, WeightSource::CurrentRank);
    }

    #[test]
    fn test_peak_rank_dominates_when_higher() {
        // Radiant peak at 90% = 450 beats Immortal 1 = 300.
        let w = evidence_weight(evidence(Some("Immortal 1"), Some("Radiant"), 0));
        assert_eq!(w.weight, 450);
        assert_eq!(w.source, WeightSource::PeakRank);
    }

    #[test]
    fn test_unranked_player_defaults() {
        let w = evidence_weight(evidence(None, None, 0));
        assert_eq!(w.weight, 150);
        assert_eq!(w.source, WeightSource::CurrentRank);
    }

    #[test]
    fn test_tournament_bonus_is_capped() {
        assert_eq!(evidence_weight(evidence(Some("Silver 1"), None, 2)).weight, 40 + 30);
        let capped = evidence_weight(evidence(Some("Silver 1"), None, 12));
        assert_eq!(capped.tournament_bonus, 75);
        assert_eq!(capped.weight, 115);
    }

    #[test]
    fn test_manual_override_wins() {
        let w = evidence_weight(RankEvidence {
            current_rank: Some("Radiant"),
            peak_rank: None,
            manual_override: Some(222),
            tournaments_won: 5,
        });
        assert_eq!(w.weight, 222);
        assert_eq!(w.source, WeightSource::ManualOverride);
        assert_eq!(w.tournament_bonus, 0);
    }
}
