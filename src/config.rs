use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    /// Absent means the in-memory backend.
    pub database_url: Option<String>,
    pub api_prefix: String,

    // Rate limiting
    pub rate_api_per_min: u32,

    // Finance read cache
    pub cache_ttl_secs: u32,
    pub cache_max_capacity: u64,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value `{raw}`")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            server_addr: get("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            database_url: get("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            api_prefix: get("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            rate_api_per_min: parse_or(&get, "RATE_API_PER_MIN", 1000)?,

            cache_ttl_secs: parse_or(&get, "CACHE_TTL_SECS", 30)?,
            cache_max_capacity: parse_or(&get, "CACHE_MAX_CAPACITY", 10_000)?,

            log_dir: get("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level: match get("LOG_LEVEL") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("LOG_LEVEL has an invalid value `{raw}`"))?,
                None => tracing::Level::DEBUG,
            },
        })
    }
}
