use crate::config::RealtimeConfig;
use std::time::Duration;

/// Exponential reconnect delays.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub multiplier: u32,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            cap: Duration::from_secs(15),
            multiplier: 2,
            max_retries: None,
        }
    }
}

impl From<&RealtimeConfig> for BackoffPolicy {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            base: config.backoff_base(),
            cap: config.backoff_cap(),
            ..Default::default()
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry `attempt` (0-based): `base * multiplier^attempt`,
    /// never above `cap`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).checked_pow(attempt);
        factor
            .and_then(|f| self.base.checked_mul(f))
            .map(|d| d.min(self.cap))
            .unwrap_or(self.cap)
    }

    pub fn start(&self) -> Backoff {
        Backoff {
            policy: self.clone(),
            attempt: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
}

impl Backoff {
    /// Next delay, or `None` once `max_retries` is used up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.policy.max_retries {
            if self.attempt >= max {
                return None;
            }
        }
        let delay = self.policy.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule_doubles_to_cap() {
        let mut backoff = BackoffPolicy::default().start();
        let delays: Vec<u64> = (0..8)
            .map(|_| backoff.next_delay().unwrap().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![500, 1_000, 2_000, 4_000, 8_000, 15_000, 15_000, 15_000]);
    }

    #[test]
    fn test_unbounded_by_default() {
        let mut backoff = BackoffPolicy::default().start();
        for _ in 0..1_000 {
            assert!(backoff.next_delay().is_some());
        }
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_reset_restarts_schedule() {
        let mut backoff = BackoffPolicy::default().start();
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.attempts(), 2);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_max_retries() {
        let policy = BackoffPolicy {
            max_retries: Some(2),
            ..Default::default()
        };
        let mut backoff = policy.start();
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
    }

    #[test]
    fn test_policy_from_config() {
        let config = RealtimeConfig {
            channel: "veto_updates".to_string(),
            backoff_base_ms: 100,
            backoff_cap_ms: 250,
        };
        let policy = BackoffPolicy::from(&config);
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(250));
    }
}
