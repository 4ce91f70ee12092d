//! Post-commit change notification.
//!
//! Handlers commit their store transaction before returning, so a success
//! status here means the change is durable and subscribers may refetch.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use bazaar_live::BroadcasterHandle;
use tracing::{debug, warn};

/// Posts `"update"` to the broadcaster after a successful mutation.
pub async fn broadcast_on_success(
    State(broadcaster): State<BroadcasterHandle>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    if response.status().is_success() {
        match broadcaster.notify_update().await {
            Ok(()) => debug!(%method, %path, "Posted update"),
            Err(e) => warn!(%method, %path, error = %e, "Failed to post update"),
        }
    }
    response
}
