//! Client tuning parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:3000/ws";
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;
pub const DEFAULT_BACKOFF_CAP_MS: u64 = 10_000;
pub const DEFAULT_LERP_FACTOR: f64 = 0.2;
pub const DEFAULT_POSITION_EPSILON: f64 = 0.5;
pub const DEFAULT_PROJECTILE_LIFETIME_MS: u64 = 450;
pub const DEFAULT_AIM_RECENCY_MS: u64 = 800;
pub const DEFAULT_NOTICE_TTL_MS: u64 = 3000;
pub const DEFAULT_STATUS_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid server url '{0}': expected ws:// or wss://")]
    InvalidServerUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            cap: Duration::from_millis(DEFAULT_BACKOFF_CAP_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub server_url: String,
    pub backoff: BackoffConfig,
    /// Fraction of the remaining distance a troop covers each frame.
    pub lerp_factor: f64,
    /// Pixel distance under which positions count as equal.
    pub position_epsilon: f64,
    pub projectile_lifetime_ms: u64,
    pub aim_recency_ms: u64,
    pub notice_ttl_ms: u64,
    pub status_poll_interval_ms: u64,
    pub frame_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_owned(),
            backoff: BackoffConfig::default(),
            lerp_factor: DEFAULT_LERP_FACTOR,
            position_epsilon: DEFAULT_POSITION_EPSILON,
            projectile_lifetime_ms: DEFAULT_PROJECTILE_LIFETIME_MS,
            aim_recency_ms: DEFAULT_AIM_RECENCY_MS,
            notice_ttl_ms: DEFAULT_NOTICE_TTL_MS,
            status_poll_interval_ms: DEFAULT_STATUS_POLL_INTERVAL_MS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

impl SyncConfig {
    /// Build config from environment variables.
    ///
    /// All optional; unparsable numbers fall back to their defaults:
    /// - `SKIRMISH_SERVER_URL`
    /// - `SKIRMISH_BACKOFF_BASE_MS`, `SKIRMISH_BACKOFF_CAP_MS`
    /// - `SKIRMISH_LERP_FACTOR` (clamped to `(0, 1]`), `SKIRMISH_POSITION_EPSILON`
    /// - `SKIRMISH_PROJECTILE_LIFETIME_MS`, `SKIRMISH_AIM_RECENCY_MS`
    /// - `SKIRMISH_NOTICE_TTL_MS`, `SKIRMISH_STATUS_POLL_INTERVAL_MS`
    /// - `SKIRMISH_FRAME_INTERVAL_MS`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidServerUrl`] when the URL is not a websocket URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url = std::env::var("SKIRMISH_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_owned());
        let base_ms = env_parse("SKIRMISH_BACKOFF_BASE_MS", DEFAULT_BACKOFF_BASE_MS).max(1);
        let cap_ms = env_parse("SKIRMISH_BACKOFF_CAP_MS", DEFAULT_BACKOFF_CAP_MS).max(base_ms);

        let config = Self {
            server_url,
            backoff: BackoffConfig { base: Duration::from_millis(base_ms), cap: Duration::from_millis(cap_ms) },
            lerp_factor: clamp_factor(env_parse("SKIRMISH_LERP_FACTOR", DEFAULT_LERP_FACTOR)),
            position_epsilon: env_parse("SKIRMISH_POSITION_EPSILON", DEFAULT_POSITION_EPSILON).abs(),
            projectile_lifetime_ms: env_parse("SKIRMISH_PROJECTILE_LIFETIME_MS", DEFAULT_PROJECTILE_LIFETIME_MS)
                .max(1),
            aim_recency_ms: env_parse("SKIRMISH_AIM_RECENCY_MS", DEFAULT_AIM_RECENCY_MS),
            notice_ttl_ms: env_parse("SKIRMISH_NOTICE_TTL_MS", DEFAULT_NOTICE_TTL_MS),
            status_poll_interval_ms: env_parse("SKIRMISH_STATUS_POLL_INTERVAL_MS", DEFAULT_STATUS_POLL_INTERVAL_MS)
                .max(1),
            frame_interval_ms: env_parse("SKIRMISH_FRAME_INTERVAL_MS", DEFAULT_FRAME_INTERVAL_MS).max(1),
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidServerUrl`] when the URL is not a websocket URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.starts_with("ws://") || self.server_url.starts_with("wss://") {
            Ok(())
        } else {
            Err(ConfigError::InvalidServerUrl(self.server_url.clone()))
        }
    }
}

fn clamp_factor(raw: f64) -> f64 {
    if raw.is_finite() && raw > 0.0 { raw.min(1.0) } else { DEFAULT_LERP_FACTOR }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
