//! # Subscriber Connections
//!
//! A [`LiveConnection`] is the two halves of one client link, erased to the
//! only things the broadcaster needs: a sink of text payloads and a stream
//! whose end means the client is gone.
//!
//! ```text
//! ┌──────────────────────────────┐          ┌──────────────────────────────┐
//! │  outbound: Sink<String>      │ ───────► │  client                      │
//! │  (owned by the actor)        │          │                              │
//! │                              │          │                              │
//! │  inbound: Stream<()>         │ ◄─────── │  any frame, close, error     │
//! │  (owned by the listener)     │          │                              │
//! └──────────────────────────────┘          └──────────────────────────────┘
//! ```

use std::fmt::Display;
use std::pin::Pin;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{future, sink, stream, Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::error::LiveError;

pub(crate) type Outbound = Pin<Box<dyn Sink<String, Error = LiveError> + Send>>;
pub(crate) type Inbound = Pin<Box<dyn Stream<Item = Result<(), LiveError>> + Send>>;

/// One subscriber link, ready to be handed to the broadcaster.
pub struct LiveConnection {
    pub(crate) outbound: Outbound,
    pub(crate) inbound: Inbound,
}

impl LiveConnection {
    /// Wraps any sink/stream pair.
    ///
    /// Items read from `inbound` are discarded; the stream ending or
    /// yielding an error is what the broadcaster watches for.
    pub fn new<S, SE, R, T, RE>(outbound: S, inbound: R) -> Self
    where
        S: Sink<String, Error = SE> + Send + 'static,
        SE: Display,
        R: Stream<Item = Result<T, RE>> + Send + 'static,
        RE: Display,
    {
        let outbound = outbound.sink_map_err(|e| LiveError::SendFailed(e.to_string()));
        let inbound = inbound.map(|item| {
            item.map(|_| ())
                .map_err(|e| LiveError::ReceiveFailed(e.to_string()))
        });

        LiveConnection {
            outbound: Box::pin(outbound),
            inbound: Box::pin(inbound),
        }
    }

    /// Wraps an upgraded axum WebSocket. Payloads go out as text frames.
    pub fn from_websocket(socket: WebSocket) -> Self {
        let (sender, receiver) = socket.split();
        let sender = sender.with(|text: String| {
            future::ready(Ok::<_, axum::Error>(Message::Text(text.into())))
        });
        LiveConnection::new(sender, receiver)
    }

    /// Creates an in-process connection and the client end that talks to it.
    ///
    /// `buffer` bounds how many payloads may sit unread at the client before
    /// sends start to block.
    pub fn channel(buffer: usize) -> (Self, ChannelClient) {
        let (out_tx, out_rx) = mpsc::channel::<String>(buffer);
        let (in_tx, in_rx) = mpsc::channel::<String>(buffer);

        let outbound = sink::unfold(out_tx, |tx, text: String| async move {
            tx.send(text).await.map_err(|_| "client dropped")?;
            Ok::<_, &'static str>(tx)
        });
        let inbound = stream::unfold(in_rx, |mut rx| async move {
            rx.recv()
                .await
                .map(|text| (Ok::<_, &'static str>(text), rx))
        });

        let client = ChannelClient {
            received: out_rx,
            sender: Some(in_tx),
        };
        (LiveConnection::new(outbound, inbound), client)
    }
}

impl std::fmt::Debug for LiveConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveConnection").finish_non_exhaustive()
    }
}

/// The client side of [`LiveConnection::channel`].
#[derive(Debug)]
pub struct ChannelClient {
    received: mpsc::Receiver<String>,
    sender: Option<mpsc::Sender<String>>,
}

impl ChannelClient {
    /// Waits for the next payload. `None` once the broadcaster dropped
    /// this subscriber.
    pub async fn recv(&mut self) -> Option<String> {
        self.received.recv().await
    }

    /// Returns a payload that has already arrived, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.received.try_recv().ok()
    }

    /// Ends the client's inbound stream, as a closed socket would.
    pub fn hang_up(&mut self) {
        self.sender = None;
    }
}
