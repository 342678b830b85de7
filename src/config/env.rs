// src/config/env.rs
// Environment-based configuration - single source of truth for all env vars

use std::str::FromStr;

use tracing::{debug, warn};

use crate::logging::LogFormat;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_API_KEY: &str = "dev-key";
pub const DEFAULT_SERVER_NAME: &str = "Unknown";
pub const DEFAULT_ALLOWED_ORIGINS: &str =
    "https://neip.xyz,https://www.neip.xyz,http://localhost:3000";
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address (HOST)
    pub host: String,
    /// Bind port (PORT)
    pub port: u16,
    /// Bearer token required on diagnostic routes (API_KEY)
    pub api_key: String,
    /// Label attached to every event and start message (SERVER_NAME)
    pub server_name: String,
    /// CORS allow-list (ALLOWED_ORIGINS, comma separated)
    pub allowed_origins: Vec<String>,
    /// Log output format (LOG_FORMAT)
    pub log_format: LogFormat,
    /// Requests allowed per client IP inside one window on /api (RATE_LIMIT_MAX)
    pub rate_limit_max: u32,
    /// Length of the rate limit window in seconds (RATE_LIMIT_WINDOW_SECS)
    pub rate_limit_window_secs: u64,
    /// Whether API_KEY was actually provided
    api_key_configured: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ServerConfig {
    /// Load from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = read("API_KEY");
        let origins = read("ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string());

        Self {
            host: read("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("PORT", read("PORT"), DEFAULT_PORT),
            api_key_configured: api_key.is_some(),
            api_key: api_key.unwrap_or_else(|| DEFAULT_API_KEY.to_string()),
            server_name: read("SERVER_NAME").unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
            allowed_origins: parse_origins(&origins),
            log_format: parse_or("LOG_FORMAT", read("LOG_FORMAT"), LogFormat::Pretty),
            rate_limit_max: parse_positive("RATE_LIMIT_MAX", read("RATE_LIMIT_MAX"), DEFAULT_RATE_LIMIT_MAX),
            rate_limit_window_secs: parse_positive(
                "RATE_LIMIT_WINDOW_SECS",
                read("RATE_LIMIT_WINDOW_SECS"),
                DEFAULT_RATE_LIMIT_WINDOW_SECS,
            ),
        }
    }

    /// `host:port` for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn api_key_configured(&self) -> bool {
        self.api_key_configured
    }

    /// Log the effective settings (without exposing the key)
    pub fn log_status(&self) {
        if !self.api_key_configured {
            warn!("API_KEY not set - using the development key, do not expose this server");
        }
        debug!(
            host = %self.host,
            port = self.port,
            server = %self.server_name,
            origins = ?self.allowed_origins,
            log_format = %self.log_format,
            rate_limit_max = self.rate_limit_max,
            rate_limit_window_secs = self.rate_limit_window_secs,
            "Server configuration loaded"
        );
    }
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> T
where
    T: FromStr,
{
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "Invalid value, using default");
            default
        }),
        None => default,
    }
}

/// Like `parse_or`, but zero also falls back to the default
fn parse_positive<T>(name: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + Default + PartialEq + Copy,
{
    let parsed = parse_or(name, value, default);
    if parsed == T::default() {
        warn!(var = name, "Zero is not allowed, using default");
        return default;
    }
    parsed
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
