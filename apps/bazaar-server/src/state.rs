//! Shared application state.

use std::sync::Arc;

use axum::extract::FromRef;
use bazaar_db::Database;
use bazaar_live::BroadcasterHandle;

use crate::config::ServerConfig;

/// State handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub broadcaster: BroadcasterHandle,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, broadcaster: BroadcasterHandle, config: ServerConfig) -> Self {
        AppState {
            db,
            broadcaster,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for BroadcasterHandle {
    fn from_ref(state: &AppState) -> Self {
        state.broadcaster.clone()
    }
}
