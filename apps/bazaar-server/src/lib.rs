//! # Bazaar Server
//!
//! HTTP request dispatcher for the sale event backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Bazaar Server                                 │
//! │                                                                         │
//! │  request ──► TraceLayer ──► Authenticated ──► capability check          │
//! │                               (session cookie)        │                 │
//! │                                                       ▼                 │
//! │                                   bazaar-db repositories (transaction)  │
//! │                                                       │                 │
//! │                           2xx on a mutating route     ▼                 │
//! │                              broadcast_on_success ──► Broadcaster       │
//! │                                                          │              │
//! │  session expiry task (interval) ──► sessions().expire    ▼              │
//! │                                                   /websocket clients    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `BAZAAR_BIND_ADDR` - listener address (default: 127.0.0.1)
//! - `BAZAAR_PORT` - HTTP port (default: 8000)
//! - `BAZAAR_DATABASE_PATH` - SQLite file (default: bazaar.db)
//! - `BAZAAR_SESSION_TTL_SECS` - session lifetime (default: 86400)
//! - `BAZAAR_SESSION_SWEEP_SECS` - expiry period (default: 300)
//! - `BAZAAR_BROADCAST_TIMEOUT_MS` - per-subscriber send deadline (default: 2000)
//! - `BAZAAR_SECURE_COOKIES` - mark the session cookie `Secure` (default: false)
//! - `BAZAAR_LOG_JSON` - JSON log lines (default: false)
//! - `RUST_LOG` - tracing filter

pub mod auth;
pub mod config;
pub mod error;
pub mod expiry;
pub mod extract;
pub mod logging;
pub mod notify;
pub mod routes;
pub mod state;

// Re-exports
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;
pub use state::AppState;
