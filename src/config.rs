use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::{Result, anyhow};
use tracing::{info, warn};

use crate::upstream::DEFAULT_API_URL;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub api_url: String,
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: try_load("RUST_PORT", "8000")?,
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379")?,
            api_url: try_load("JOTFORM_API_URL", DEFAULT_API_URL)?,
            upstream_timeout: Duration::from_secs(try_load("UPSTREAM_TIMEOUT_SECS", "30")?),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    parse(key, &raw)
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: Display,
{
    raw.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        anyhow!("Environment misconfigured: {key}: {e}")
    })
}
