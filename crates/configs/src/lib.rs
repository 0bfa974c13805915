//! # configs
//!
//! Layered configuration: compiled defaults, an optional `quorum.toml`, and
//! `QUORUM_`-prefixed environment variables (highest precedence). The
//! database URL is secrecy-wrapped so it never lands in logs.

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: SecretString,
    pub max_connections: u32,
}

/// One fixed-window budget, as configured.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QuotaConfig {
    pub window_ms: u64,
    pub max_requests: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitConfig {
    pub create_thread: QuotaConfig,
    pub create_post: QuotaConfig,
    pub toggle_reaction: QuotaConfig,
    pub file_report: QuotaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
    /// When present, rate-limit counters move to the shared store.
    pub redis: Option<RedisConfig>,
}

impl AppConfig {
    /// Loads `.env`, then defaults < `quorum.toml` < `QUORUM_*` env vars
    /// (e.g. `QUORUM_SERVER__PORT=9000`).
    pub fn load() -> Result<AppConfig, ConfigError> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "postgres://localhost:5432/quorum")?
            .set_default("database.max_connections", 10)?
            .set_default("rate_limit.create_thread.window_ms", 300_000)?
            .set_default("rate_limit.create_thread.max_requests", 5)?
            .set_default("rate_limit.create_post.window_ms", 60_000)?
            .set_default("rate_limit.create_post.max_requests", 10)?
            .set_default("rate_limit.toggle_reaction.window_ms", 60_000)?
            .set_default("rate_limit.toggle_reaction.max_requests", 30)?
            .set_default("rate_limit.file_report.window_ms", 600_000)?
            .set_default("rate_limit.file_report.max_requests", 5)?
            .add_source(config::File::with_name("quorum").required(false))
            .add_source(config::Environment::with_prefix("QUORUM").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_any_file_or_env() {
        let config = AppConfig::load().expect("defaults should always deserialize");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.rate_limit.create_post.max_requests, 10);
        assert!(config.redis.is_none());
    }
}
