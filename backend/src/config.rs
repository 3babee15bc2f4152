use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub discord: DiscordConfig,
    pub email: EmailConfig,
    pub ai: AiConfig,
    pub balancing: BalancingConfig,
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub rust_log: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    /// Hex-encoded ed25519 application public key.
    pub public_key: String,
    /// Discord user ids allowed to run the admin test commands.
    pub admin_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    /// Email delivery is disabled when unset.
    pub api_key: Option<String>,
    pub from_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    pub api_url: String,
    /// The chat proxy answers 503 when unset.
    pub api_key: Option<String>,
    pub model: String,
}

/// Tuning for the team balancing heuristics.
#[derive(Debug, Deserialize, Clone)]
pub struct BalancingConfig {
    /// Weight delta at which quick-match confidence drops to 75%.
    pub confidence_threshold: f64,
    /// Players at or above this weight count as elite for ATLAS.
    pub elite_threshold: u32,
    /// Team total spread tolerated before ATLAS validation penalizes it.
    pub spread_threshold: u32,
}

impl Default for BalancingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 50.0,
            elite_threshold: 400,
            spread_threshold: 150,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RealtimeConfig {
    pub channel: String,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel: "veto_updates".to_string(),
            backoff_base_ms: 500,
            backoff_cap_ms: 15_000,
        }
    }
}

impl RealtimeConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_millis(self.backoff_cap_ms)
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    optional_var(key).unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(key) {
        Some(raw) => Ok(raw.parse()?),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;
        let redis_url = env::var("REDIS_URL")?;
        let jwt_secret = env::var("JWT_SECRET")?;
        let discord_public_key = env::var("DISCORD_PUBLIC_KEY")?;
        let port: u16 = env::var("PORT")?.parse()?;
        let host = env::var("HOST")?;
        let rust_log = var_or("RUST_LOG", "info");

        let balancing_defaults = BalancingConfig::default();
        let realtime_defaults = RealtimeConfig::default();

        Ok(Config {
            database: DatabaseConfig { url: database_url },
            redis: RedisConfig { url: redis_url },
            server: ServerConfig { port, host, rust_log },
            auth: AuthConfig { jwt_secret },
            discord: DiscordConfig {
                public_key: discord_public_key,
                admin_ids: split_list(&var_or("DISCORD_ADMIN_IDS", "")),
            },
            email: EmailConfig {
                api_url: var_or("EMAIL_API_URL", "https://api.resend.com/emails"),
                api_key: optional_var("EMAIL_API_KEY"),
                from_address: var_or("EMAIL_FROM", "noreply@localhost"),
            },
            ai: AiConfig {
                api_url: var_or("AI_API_URL", "https://api.openai.com/v1/chat/completions"),
                api_key: optional_var("AI_API_KEY"),
                model: var_or("AI_MODEL", "gpt-4o-mini"),
            },
            balancing: BalancingConfig {
                confidence_threshold: parse_or(
                    "BALANCE_CONFIDENCE_THRESHOLD",
                    balancing_defaults.confidence_threshold,
                )?,
                elite_threshold: parse_or("ATLAS_ELITE_THRESHOLD", balancing_defaults.elite_threshold)?,
                spread_threshold: parse_or(
                    "ATLAS_SPREAD_THRESHOLD",
                    balancing_defaults.spread_threshold,
                )?,
            },
            realtime: RealtimeConfig {
                channel: var_or("REALTIME_CHANNEL", &realtime_defaults.channel),
                backoff_base_ms: parse_or("REALTIME_BACKOFF_BASE_MS", realtime_defaults.backoff_base_ms)?,
                backoff_cap_ms: parse_or("REALTIME_BACKOFF_CAP_MS", realtime_defaults.backoff_cap_ms)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_trims_and_skips_empty() {
        assert_eq!(
            split_list(" 123, 456 ,,789 "),
            vec!["123".to_string(), "456".to_string(), "789".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_defaults() {
        let balancing = BalancingConfig::default();
        assert_eq!(balancing.confidence_threshold, 50.0);
        assert_eq!(balancing.elite_threshold, 400);

        let realtime = RealtimeConfig::default();
        assert_eq!(realtime.backoff_base(), Duration::from_millis(500));
        assert_eq!(realtime.backoff_cap(), Duration::from_secs(15));
        assert_eq!(realtime.channel, "veto_updates");
    }
}
