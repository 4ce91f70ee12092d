//! # bazaar-live: Live Update Broadcaster
//!
//! Browsers watching item or sale views keep a WebSocket open. Whenever a
//! mutating request commits, the server posts one "update" payload here and
//! every connected client re-fetches what it shows.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Live Update Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────────────────┐  │
//! │  │  Request Dispatcher  │        │  GET /websocket (hub.rs)          │  │
//! │  │  (bazaar-server)     │        │  upgrade ──► LiveConnection       │  │
//! │  └──────────┬───────────┘        └────────────────┬─────────────────┘  │
//! │             │ notify_update()                     │ subscribe()        │
//! │             ▼                                     ▼                    │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │              BroadcasterHandle (mpsc, capacity 1)                 │  │
//! │  └────────────────────────────────┬─────────────────────────────────┘  │
//! │                                   ▼                                    │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Broadcaster actor (broadcaster.rs)                               │  │
//! │  │  sole owner of Vec<Subscriber>; one listener task per subscriber │  │
//! │  │  posts Unsubscribe when its connection's read side ends          │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`broadcaster`] - The actor and its handle
//! - [`connection`] - Sink/stream pair for one subscriber (WebSocket or channel)
//! - [`hub`] - axum WebSocket endpoint
//! - [`error`] - Live update error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bazaar_live::{Broadcaster, BroadcasterConfig};
//!
//! let broadcaster = Broadcaster::new(BroadcasterConfig::default()).start();
//! let app = bazaar_live::hub::routes().with_state(broadcaster.clone());
//!
//! // after a sale commits
//! broadcaster.notify_update().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod broadcaster;
pub mod connection;
pub mod error;
pub mod hub;

// =============================================================================
// Re-exports
// =============================================================================

pub use broadcaster::{
    Broadcaster, BroadcasterConfig, BroadcasterHandle, SubscriberId, DEFAULT_SEND_TIMEOUT,
};
pub use connection::{ChannelClient, LiveConnection};
pub use error::{LiveError, LiveResult};
