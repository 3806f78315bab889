//! Environment-driven configuration. Read once at startup; nothing else
//! touches the environment.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Default completion model served through OpenRouter.
const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3.1";
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DB_PATH: &str = "data/studydeck.db";
const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: String,
    pub db_path: PathBuf,
    pub oracle_key: String,
    pub oracle_base_url: String,
    pub oracle_model: String,
    pub oracle_timeout_secs: u64,
    pub log_level: log::LevelFilter,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let oracle_key = match std::env::var("OPENROUTER_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("OPENROUTER_KEY must be set"),
        };

        let oracle_timeout_secs = match std::env::var("ORACLE_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .context("ORACLE_TIMEOUT_SECS must be a positive integer")?,
            Err(_) => DEFAULT_ORACLE_TIMEOUT_SECS,
        };

        let log_level = match std::env::var("STUDYDECK_LOG") {
            Ok(raw) => raw
                .parse::<log::LevelFilter>()
                .context("STUDYDECK_LOG must be one of off/error/warn/info/debug/trace")?,
            Err(_) => log::LevelFilter::Info,
        };

        Ok(Self {
            addr: env_or("STUDYDECK_ADDR", DEFAULT_ADDR),
            db_path: PathBuf::from(env_or("STUDYDECK_DB", DEFAULT_DB_PATH)),
            oracle_key,
            oracle_base_url: env_or("ORACLE_BASE_URL", DEFAULT_BASE_URL),
            oracle_model: env_or("ORACLE_MODEL", DEFAULT_MODEL),
            oracle_timeout_secs,
            log_level,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
impl AppConfig {
    /// Config pointing at a local stub oracle, for tests that never hit the
    /// network.
    pub fn for_tests() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            db_path: PathBuf::from(":memory:"),
            oracle_key: "test-key".to_string(),
            oracle_base_url: "http://127.0.0.1:0".to_string(),
            oracle_model: DEFAULT_MODEL.to_string(),
            oracle_timeout_secs: 1,
            log_level: log::LevelFilter::Off,
        }
    }
}
