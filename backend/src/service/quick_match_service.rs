use crate::api_error::ApiError;
use crate::service::player_service::{balancer_player, PlayerService};
use crate::service::team_balancer::{balance_quick_match_teams, QuickMatchBalance, QUICK_MATCH_PLAYERS};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const QUEUE_KEY: &str = "quickmatch:queue";

/// Appends the player unless already queued. Returns position, size and
/// whether the player was added.
const JOIN_SCRIPT: &str = r#"
local pos = redis.call('LPOS', KEYS[1], ARGV[1])
if pos then
    return {pos + 1, redis.call('LLEN', KEYS[1]), 0}
end
local len = redis.call('RPUSH', KEYS[1], ARGV[1])
return {len, len, 1}
"#;

/// Takes the first ARGV[1] entries only when that many are queued.
const POP_SCRIPT: &str = r#"
local n = tonumber(ARGV[1])
if redis.call('LLEN', KEYS[1]) < n then
    return {}
end
local ids = redis.call('LRANGE', KEYS[1], 0, n - 1)
redis.call('LTRIM', KEYS[1], n, -1)
return ids
"#;

/// Pushes ARGV back onto the head in order, skipping anyone who rejoined
/// meanwhile. Returns the queue length.
const REQUEUE_SCRIPT: &str = r#"
for i = #ARGV, 1, -1 do
    if not redis.call('LPOS', KEYS[1], ARGV[i]) then
        redis.call('LPUSH', KEYS[1], ARGV[i])
    end
end
return redis.call('LLEN', KEYS[1])
"#;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueStatus {
    /// 1-based.
    pub position: usize,
    pub size: usize,
    pub newly_joined: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuickMatchOutcome {
    pub status: QueueStatus,
    pub formed: Option<QuickMatchBalance>,
}

fn parse_ids(raw: Vec<String>) -> Vec<Uuid> {
    raw.into_iter()
        .filter_map(|s| match Uuid::parse_str(&s) {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(entry = %s, "Dropping malformed quick match queue entry");
                None
            }
        })
        .collect()
}

/// What to do with a batch taken off the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPlan {
    /// Distinct players with a profile, in queue order.
    pub players: Vec<Uuid>,
    /// Entries without a profile, and repeats.
    pub dropped: Vec<Uuid>,
}

impl MatchPlan {
    /// A full plan is balanced; anything less goes back to the queue.
    pub fn is_full(&self) -> bool {
        self.players.len() == QUICK_MATCH_PLAYERS
    }
}

pub fn plan_match(popped: &[Uuid], with_profile: &HashSet<Uuid>) -> MatchPlan {
    let mut seen = HashSet::with_capacity(popped.len());
    let (players, dropped): (Vec<Uuid>, Vec<Uuid>) = popped
        .iter()
        .copied()
        .partition(|id| with_profile.contains(id) && seen.insert(*id));
    MatchPlan { players, dropped }
}

/// The Redis list players wait in. Every mutation is a single script, so
/// concurrent joins never double-queue a player or split a batch.
#[derive(Clone)]
pub struct QuickMatchQueue {
    redis: ConnectionManager,
    key: String,
}

impl QuickMatchQueue {
    pub fn new(redis: ConnectionManager) -> Self {
        Self::with_key(redis, QUEUE_KEY)
    }

    pub fn with_key(redis: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            redis,
            key: key.into(),
        }
    }

    pub async fn join(&self, user_id: Uuid) -> Result<QueueStatus, ApiError> {
        let mut conn = self.redis.clone();
        let (position, size, added): (usize, usize, u8) = Script::new(JOIN_SCRIPT)
            .key(&self.key)
            .arg(user_id.to_string())
            .invoke_async(&mut conn)
            .await?;

        Ok(QueueStatus {
            position,
            size,
            newly_joined: added == 1,
        })
    }

    /// Returns whether the player was queued.
    pub async fn leave(&self, user_id: Uuid) -> Result<bool, ApiError> {
        let mut conn = self.redis.clone();
        let removed: usize = conn.lrem(&self.key, 0, user_id.to_string()).await?;
        Ok(removed > 0)
    }

    pub async fn size(&self) -> Result<usize, ApiError> {
        let mut conn = self.redis.clone();
        let size: usize = conn.llen(&self.key).await?;
        Ok(size)
    }

    /// `None` when the player is not queued.
    pub async fn status(&self, user_id: Uuid) -> Result<Option<QueueStatus>, ApiError> {
        let mut conn = self.redis.clone();
        let (position, size): (Option<usize>, usize) = redis::pipe()
            .atomic()
            .cmd("LPOS")
            .arg(&self.key)
            .arg(user_id.to_string())
            .cmd("LLEN")
            .arg(&self.key)
            .query_async(&mut conn)
            .await?;

        Ok(position.map(|p| QueueStatus {
            position: p + 1,
            size,
            newly_joined: false,
        }))
    }

    /// Removes the first `count` entries, but only when that many are queued.
    pub async fn pop(&self, count: usize) -> Result<Option<Vec<Uuid>>, ApiError> {
        let mut conn = self.redis.clone();
        let raw: Vec<String> = Script::new(POP_SCRIPT)
            .key(&self.key)
            .arg(count)
            .invoke_async(&mut conn)
            .await?;

        if raw.is_empty() {
            return Ok(None);
        }
        Ok(Some(parse_ids(raw)))
    }

    /// Puts players back at the head of the queue, keeping their order.
    pub async fn requeue(&self, user_ids: &[Uuid]) -> Result<usize, ApiError> {
        if user_ids.is_empty() {
            return self.size().await;
        }
        let mut conn = self.redis.clone();
        let script = Script::new(REQUEUE_SCRIPT);
        let mut invocation = script.key(&self.key);
        for id in user_ids {
            invocation.arg(id.to_string());
        }
        let size: usize = invocation.invoke_async(&mut conn).await?;
        Ok(size)
    }
}

#[derive(Clone)]
pub struct QuickMatchService {
    queue: QuickMatchQueue,
    players: PlayerService,
    confidence_threshold: f64,
}

impl QuickMatchService {
    pub fn new(redis: ConnectionManager, players: PlayerService, confidence_threshold: f64) -> Self {
        Self {
            queue: QuickMatchQueue::new(redis),
            players,
            confidence_threshold,
        }
    }

    pub async fn join(&self, user_id: Uuid) -> Result<QueueStatus, ApiError> {
        self.queue.join(user_id).await
    }

    pub async fn leave(&self, user_id: Uuid) -> Result<bool, ApiError> {
        self.queue.leave(user_id).await
    }

    pub async fn size(&self) -> Result<usize, ApiError> {
        self.queue.size().await
    }

    /// Atomically removes the first ten queued players when ten are waiting.
    pub async fn try_pop_match(&self) -> Result<Option<Vec<Uuid>>, ApiError> {
        self.queue.pop(QUICK_MATCH_PLAYERS).await
    }

    pub async fn form_match(&self, user_ids: &[Uuid]) -> Result<QuickMatchBalance, ApiError> {
        let profiles = self.players.get_profiles(user_ids).await?;
        let players: Vec<_> = profiles.iter().map(balancer_player).collect();
        Ok(balance_quick_match_teams(&players, self.confidence_threshold)?)
    }

    /// Queues the player and, if that filled a match, balances it.
    ///
    /// Entries without a player profile are dropped from a popped batch and
    /// the rest go back to the head of the queue, so one bad entry cannot
    /// hold the queue up.
    pub async fn join_and_match(&self, user_id: Uuid) -> Result<QuickMatchOutcome, ApiError> {
        let status = self.queue.join(user_id).await?;
        let Some(popped) = self.try_pop_match().await? else {
            return Ok(QuickMatchOutcome { status, formed: None });
        };

        let profiles = match self.players.find_profiles(&popped).await {
            Ok(profiles) => profiles,
            Err(e) => {
                error!(error = %e, "Quick match profile lookup failed, requeueing players");
                self.queue.requeue(&popped).await?;
                return Err(e);
            }
        };

        let with_profile: HashSet<Uuid> = profiles.iter().map(|p| p.id).collect();
        let plan = plan_match(&popped, &with_profile);
        for id in &plan.dropped {
            warn!(user_id = %id, "Dropping quick match entry without a unique player profile");
        }

        if !plan.is_full() {
            let size = self.queue.requeue(&plan.players).await?;
            info!(
                requeued = plan.players.len(),
                dropped = plan.dropped.len(),
                size,
                "Quick match batch incomplete, players requeued"
            );
            return match self.queue.status(user_id).await? {
                Some(status) => Ok(QuickMatchOutcome { status, formed: None }),
                None => Err(ApiError::not_found("Player profile not found")),
            };
        }

        let players: Vec<_> = plan
            .players
            .iter()
            .filter_map(|id| profiles.iter().find(|p| p.id == *id))
            .map(balancer_player)
            .collect();

        match balance_quick_match_teams(&players, self.confidence_threshold) {
            Ok(balance) => {
                info!(
                    weight_delta = balance.weight_delta,
                    confidence = balance.balance_confidence,
                    "Quick match formed"
                );
                Ok(QuickMatchOutcome {
                    status,
                    formed: Some(balance),
                })
            }
            Err(e) => {
                error!(error = %e, "Quick match balancing failed, requeueing players");
                self.queue.requeue(&plan.players).await?;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_parse_ids_skips_garbage() {
        let id = Uuid::new_v4();
        let parsed = parse_ids(vec![id.to_string(), "not-a-uuid".to_string()]);
        assert_eq!(parsed, vec![id]);
    }

    #[test]
    fn test_full_plan_keeps_queue_order() {
        let popped = ids(10);
        let known: HashSet<Uuid> = popped.iter().copied().collect();
        let plan = plan_match(&popped, &known);
        assert!(plan.is_full());
        assert_eq!(plan.players, popped);
        assert!(plan.dropped.is_empty());
    }

    #[test]
    fn test_missing_profiles_are_dropped_and_rest_requeued() {
        let popped = ids(10);
        let known: HashSet<Uuid> = popped
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 2 && *i != 7)
            .map(|(_, id)| *id)
            .collect();

        let plan = plan_match(&popped, &known);
        assert!(!plan.is_full());
        assert_eq!(plan.dropped, vec![popped[2], popped[7]]);
        assert_eq!(plan.players.len(), 8);
        assert_eq!(plan.players[0], popped[0]);
        assert_eq!(plan.players[2], popped[3]);
        // The requeued batch never contains an entry that failed before.
        assert!(plan.players.iter().all(|id| known.contains(id)));
    }

    #[test]
    fn test_repeated_entries_are_dropped() {
        let mut popped = ids(9);
        popped.push(popped[4]);
        let known: HashSet<Uuid> = popped.iter().copied().collect();

        let plan = plan_match(&popped, &known);
        assert_eq!(plan.players.len(), 9);
        assert_eq!(plan.dropped, vec![popped[4]]);
        assert!(!plan.is_full());
    }
}
