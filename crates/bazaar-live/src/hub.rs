//! # Live Update Endpoint
//!
//! The `GET /websocket` route. Each upgraded connection is handed to the
//! broadcaster and from then on only receives payloads.
//!
//! ```text
//! browser ──GET /websocket──► ws_handler ──upgrade──► LiveConnection
//!                                                          │
//!                                          Subscribe ──────┘
//!                                              │
//!                                              ▼
//!                                     Broadcaster actor
//! ```

use axum::{
    extract::{ws::WebSocketUpgrade, FromRef, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use tracing::{debug, warn};

use crate::broadcaster::BroadcasterHandle;
use crate::connection::LiveConnection;

/// Path of the live update endpoint.
pub const WEBSOCKET_PATH: &str = "/websocket";

/// Router with the live update endpoint, for any state that can hand out
/// a [`BroadcasterHandle`].
pub fn routes<S>() -> Router<S>
where
    BroadcasterHandle: FromRef<S>,
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(WEBSOCKET_PATH, get(ws_handler))
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(broadcaster): State<BroadcasterHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        debug!("Live update connection upgraded");
        if let Err(e) = broadcaster
            .subscribe(LiveConnection::from_websocket(socket))
            .await
        {
            warn!(error = %e, "Could not subscribe live update connection");
        }
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use bazaar_core::UPDATE_MESSAGE;
    use futures_util::StreamExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    use super::*;
    use crate::broadcaster::{Broadcaster, BroadcasterConfig};

    type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

    async fn serve() -> (BroadcasterHandle, SocketAddr) {
        let handle = Broadcaster::new(BroadcasterConfig::default()).start();
        let app = routes().with_state(handle.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (handle, addr)
    }

    async fn connect(addr: SocketAddr) -> Client {
        let (client, _) = connect_async(format!("ws://{addr}{WEBSOCKET_PATH}"))
            .await
            .unwrap();
        client
    }

    async fn wait_for_count(handle: &BroadcasterHandle, expected: usize) {
        for _ in 0..200 {
            if handle.subscriber_count().await.unwrap() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("subscriber count never reached {expected}");
    }

    async fn next_text(client: &mut Client) -> String {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        msg.to_text().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_websocket_clients_receive_updates_in_order() {
        let (handle, addr) = serve().await;
        let mut first = connect(addr).await;
        let mut second = connect(addr).await;
        wait_for_count(&handle, 2).await;

        handle.notify_update().await.unwrap();
        handle.broadcast("m2").await.unwrap();

        for client in [&mut first, &mut second] {
            assert_eq!(next_text(client).await, UPDATE_MESSAGE);
            assert_eq!(next_text(client).await, "m2");
        }
    }

    #[tokio::test]
    async fn test_closed_websocket_is_unsubscribed() {
        let (handle, addr) = serve().await;
        let mut client = connect(addr).await;
        wait_for_count(&handle, 1).await;

        client.close(None).await.unwrap();
        wait_for_count(&handle, 0).await;

        // Broadcasting with nobody listening is fine
        handle.notify_update().await.unwrap();
    }
}
