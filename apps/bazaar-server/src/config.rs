//! Server configuration module.
//!
//! Configuration is loaded from `BAZAAR_*` environment variables with
//! fallback to defaults.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use bazaar_core::{DEFAULT_SESSION_TTL_SECS, MAX_SESSION_TTL_SECS};
use serde::Serialize;

/// Server configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: IpAddr,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Session lifetime added at login, in seconds
    pub session_ttl_secs: i64,

    /// Period of the session expiry pass, in seconds
    pub session_sweep_secs: u64,

    /// Per-subscriber send deadline of the broadcaster, in milliseconds
    pub broadcast_timeout_ms: u64,

    /// Set `Secure` on the session cookie (behind HTTPS)
    pub secure_cookies: bool,

    /// Emit JSON log lines instead of human readable ones
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: IpAddr::from([127, 0, 0, 1]),
            port: 8000,
            database_path: "bazaar.db".to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            session_sweep_secs: 300,
            broadcast_timeout_ms: 2000,
            secure_cookies: false,
            log_json: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        let config = ServerConfig {
            bind_addr: parse_or(&lookup, "BAZAAR_BIND_ADDR", defaults.bind_addr)?,
            port: parse_or(&lookup, "BAZAAR_PORT", defaults.port)?,
            database_path: lookup("BAZAAR_DATABASE_PATH").unwrap_or(defaults.database_path),
            session_ttl_secs: parse_or(&lookup, "BAZAAR_SESSION_TTL_SECS", defaults.session_ttl_secs)?,
            session_sweep_secs: parse_or(
                &lookup,
                "BAZAAR_SESSION_SWEEP_SECS",
                defaults.session_sweep_secs,
            )?,
            broadcast_timeout_ms: parse_or(
                &lookup,
                "BAZAAR_BROADCAST_TIMEOUT_MS",
                defaults.broadcast_timeout_ms,
            )?,
            secure_cookies: parse_or(&lookup, "BAZAAR_SECURE_COOKIES", defaults.secure_cookies)?,
            log_json: parse_or(&lookup, "BAZAAR_LOG_JSON", defaults.log_json)?,
        };

        if !(1..=MAX_SESSION_TTL_SECS).contains(&config.session_ttl_secs) {
            return Err(ConfigError::InvalidValue("BAZAAR_SESSION_TTL_SECS".to_string()));
        }
        if config.session_sweep_secs == 0 {
            return Err(ConfigError::InvalidValue("BAZAAR_SESSION_SWEEP_SECS".to_string()));
        }
        if config.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("BAZAAR_DATABASE_PATH".to_string()));
        }

        Ok(config)
    }

    /// Socket address of the HTTP listener.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs)
    }

    pub fn broadcast_timeout(&self) -> Duration {
        Duration::from_millis(self.broadcast_timeout_ms)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
