// src/config.rs

use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use dotenvy::dotenv;
use reqwest::Url;

use crate::error::ConfigError;

/// Default timer resolution: one tick per second.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// How long a finished session stays readable before it is discarded.
pub const DEFAULT_SESSION_RETENTION_SECS: u64 = 300;

/// What to do when an anti-cheat test is running but the student is not fullscreen
/// (the request was denied or the student left fullscreen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullscreenPolicy {
    /// Keep going; the exit is only counted and logged.
    #[default]
    Lenient,
    /// Refuse answer and navigation intents until fullscreen is restored.
    Strict,
}

impl FromStr for FullscreenPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(FullscreenPolicy::Lenient),
            "strict" => Ok(FullscreenPolicy::Strict),
            other => Err(ConfigError::Invalid {
                var: "FULLSCREEN_POLICY",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub content_api_url: Url,
    pub ledger_api_url: Url,
    pub results_api_url: Url,
    pub rust_log: String,
    pub fullscreen_policy: FullscreenPolicy,
    pub tick_interval: Duration,
    pub session_retention: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let content_api_url = base_url("CONTENT_API_URL")?;
        let ledger_api_url = base_url("LEDGER_API_URL")?;
        let results_api_url = base_url("RESULTS_API_URL")?;

        let bind_addr = match env::var("BIND_ADDR") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "BIND_ADDR",
                value: raw,
            })?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let fullscreen_policy = match env::var("FULLSCREEN_POLICY") {
            Ok(raw) => raw.parse()?,
            Err(_) => FullscreenPolicy::default(),
        };

        let tick_ms = match env::var("TICK_INTERVAL_MS") {
            Ok(raw) => raw.parse::<u64>().ok().filter(|ms| *ms > 0).ok_or(
                ConfigError::Invalid {
                    var: "TICK_INTERVAL_MS",
                    value: raw,
                },
            )?,
            Err(_) => DEFAULT_TICK_INTERVAL_MS,
        };

        let retention_secs = match env::var("SESSION_RETENTION_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                var: "SESSION_RETENTION_SECS",
                value: raw,
            })?,
            Err(_) => DEFAULT_SESSION_RETENTION_SECS,
        };

        Ok(Self {
            bind_addr,
            content_api_url,
            ledger_api_url,
            results_api_url,
            rust_log,
            fullscreen_policy,
            tick_interval: Duration::from_millis(tick_ms),
            session_retention: Duration::from_secs(retention_secs),
        })
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    env::var(var).map_err(|_| ConfigError::Missing(var))
}

/// Collaborator base URLs must be absolute http(s) URLs that can take path segments.
fn base_url(var: &'static str) -> Result<Url, ConfigError> {
    let raw = required(var)?;
    match Url::parse(&raw) {
        Ok(url) if !url.cannot_be_a_base() && matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}
