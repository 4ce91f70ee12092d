//! # Update Broadcaster
//!
//! A single actor task owns the set of live subscribers. Everything else
//! talks to it through a [`BroadcasterHandle`], which only posts messages.
//!
//! ## Message Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Broadcaster Actor Loop                             │
//! │                                                                         │
//! │  handle.subscribe(conn) ──┐                                            │
//! │  handle.broadcast(text) ──┤     mailbox (capacity 1,                   │
//! │  handle.subscriber_count ─┼──►  posting waits for the actor)           │
//! │  handle.shutdown() ───────┤            │                               │
//! │  listener: Unsubscribe ───┘            ▼                               │
//! │                             ┌──────────────────────────┐               │
//! │                             │  Vec<Subscriber>         │               │
//! │                             │  [ #0 active   ]         │               │
//! │                             │  [ #1 inactive ] ◄─ tombstone,          │
//! │                             │  [ #2 active   ]    compacted in the    │
//! │                             └──────────────────────────┘    same pass  │
//! │                                                                         │
//! │  Broadcast: send to each active subscriber in turn, each send bounded  │
//! │  by the deadline. Failure or timeout closes that subscriber only.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Subscriber States
//! ```text
//! active ──── inbound read ends or fails ────► inactive
//!    └─────── send fails or misses deadline ──────┘
//! ```
//! There is no way back. A client that lost its subscription reconnects.

use std::time::Duration;

use bazaar_core::UPDATE_MESSAGE;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::connection::{Inbound, LiveConnection, Outbound};
use crate::error::{LiveError, LiveResult};

// =============================================================================
// Constants
// =============================================================================

/// Default deadline for delivering one payload to one subscriber.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Mailbox size. Posting a message waits until the actor has room.
const MAILBOX_CAPACITY: usize = 1;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the broadcaster.
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    /// Deadline per subscriber for a send, and for closing a connection.
    pub send_timeout: Duration,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        BroadcasterConfig {
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Identifies one subscription for the lifetime of the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Messages the actor understands.
pub(crate) enum BroadcastCommand {
    Subscribe(LiveConnection),
    Unsubscribe(SubscriberId),
    Broadcast(String),
    SubscriberCount(oneshot::Sender<usize>),
    Shutdown,
}

// =============================================================================
// Handle
// =============================================================================

/// Handle for posting to the broadcaster. Cheap to clone.
///
/// The actor stops once every handle is dropped or after [`shutdown`].
///
/// [`shutdown`]: BroadcasterHandle::shutdown
#[derive(Debug, Clone)]
pub struct BroadcasterHandle {
    cmd_tx: mpsc::Sender<BroadcastCommand>,
}

impl BroadcasterHandle {
    /// Hands a connection to the broadcaster. It receives every broadcast
    /// posted after this one.
    pub async fn subscribe(&self, connection: LiveConnection) -> LiveResult<()> {
        self.post(BroadcastCommand::Subscribe(connection)).await
    }

    /// Posts `payload` to every active subscriber.
    pub async fn broadcast(&self, payload: impl Into<String>) -> LiveResult<()> {
        self.post(BroadcastCommand::Broadcast(payload.into())).await
    }

    /// Posts the "something changed" signal.
    pub async fn notify_update(&self) -> LiveResult<()> {
        self.broadcast(UPDATE_MESSAGE).await
    }

    /// Number of active subscribers, as of every message posted before.
    pub async fn subscriber_count(&self) -> LiveResult<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(BroadcastCommand::SubscriberCount(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| LiveError::ChannelError("Broadcaster dropped the reply".into()))
    }

    /// Closes every subscriber and stops the actor.
    pub async fn shutdown(&self) -> LiveResult<()> {
        self.post(BroadcastCommand::Shutdown).await
    }

    async fn post(&self, cmd: BroadcastCommand) -> LiveResult<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| LiveError::ChannelError("Broadcaster mailbox closed".into()))
    }
}

// =============================================================================
// Actor
// =============================================================================

struct Subscriber {
    id: SubscriberId,
    outbound: Outbound,
    listener: JoinHandle<()>,
    active: bool,
}

/// The actor. Create with [`Broadcaster::new`], run with [`Broadcaster::start`].
pub struct Broadcaster {
    config: BroadcasterConfig,
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl Broadcaster {
    /// Creates a broadcaster with no subscribers.
    pub fn new(config: BroadcasterConfig) -> Self {
        Broadcaster {
            config,
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Spawns the actor loop and returns a handle to it.
    pub fn start(self) -> BroadcasterHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(MAILBOX_CAPACITY);

        // Listeners hold a weak sender so that dropping every handle still
        // ends the loop.
        let listener_tx = cmd_tx.downgrade();
        tokio::spawn(async move {
            self.run(cmd_rx, listener_tx).await;
        });

        BroadcasterHandle { cmd_tx }
    }

    /// Main actor loop.
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<BroadcastCommand>,
        listener_tx: mpsc::WeakSender<BroadcastCommand>,
    ) {
        info!(send_timeout = ?self.config.send_timeout, "Broadcaster started");

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                BroadcastCommand::Subscribe(connection) => {
                    self.subscribe(connection, listener_tx.clone());
                }
                BroadcastCommand::Unsubscribe(id) => {
                    self.unsubscribe(id).await;
                }
                BroadcastCommand::Broadcast(payload) => {
                    self.broadcast(&payload).await;
                }
                BroadcastCommand::SubscriberCount(reply) => {
                    let _ = reply.send(self.active_count());
                }
                BroadcastCommand::Shutdown => {
                    info!("Broadcaster shutting down");
                    break;
                }
            }
        }

        // Refuse further posts before the subscribers go away
        cmd_rx.close();
        for subscriber in &mut self.subscribers {
            if subscriber.active {
                deactivate(subscriber, self.config.send_timeout).await;
            }
        }
        self.subscribers.clear();
        info!("Broadcaster stopped");
    }

    fn subscribe(&mut self, connection: LiveConnection, mailbox: mpsc::WeakSender<BroadcastCommand>) {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;

        let LiveConnection { outbound, inbound } = connection;
        let listener = tokio::spawn(listen(id, inbound, mailbox));

        self.subscribers.push(Subscriber {
            id,
            outbound,
            listener,
            active: true,
        });
        debug!(subscriber = %id, active = self.active_count(), "Subscriber added");
    }

    async fn unsubscribe(&mut self, id: SubscriberId) {
        if let Some(subscriber) = self.subscribers.iter_mut().find(|s| s.id == id) {
            if subscriber.active {
                deactivate(subscriber, self.config.send_timeout).await;
            }
        }
        self.compact();
        debug!(subscriber = %id, active = self.active_count(), "Subscriber removed");
    }

    async fn broadcast(&mut self, payload: &str) {
        let deadline = self.config.send_timeout;

        for subscriber in self.subscribers.iter_mut().filter(|s| s.active) {
            let result = match timeout(deadline, subscriber.outbound.send(payload.to_owned())).await {
                Ok(sent) => sent,
                Err(_) => Err(LiveError::SendTimeout(deadline)),
            };

            if let Err(e) = result {
                warn!(subscriber = %subscriber.id, error = %e, "Dropping subscriber");
                deactivate(subscriber, deadline).await;
            }
        }

        self.compact();
        debug!(payload, delivered_to = self.active_count(), "Broadcast delivered");
    }

    fn compact(&mut self) {
        self.subscribers.retain(|s| s.active);
    }

    fn active_count(&self) -> usize {
        self.subscribers.iter().filter(|s| s.active).count()
    }
}

/// Marks a subscriber inactive, stops its listener and closes its sink.
async fn deactivate(subscriber: &mut Subscriber, deadline: Duration) {
    subscriber.active = false;
    subscriber.listener.abort();
    if timeout(deadline, subscriber.outbound.close()).await.is_err() {
        debug!(subscriber = %subscriber.id, "Close timed out");
    }
}

/// Waits on a subscriber's inbound half and reports when it ends.
async fn listen(id: SubscriberId, mut inbound: Inbound, mailbox: mpsc::WeakSender<BroadcastCommand>) {
    loop {
        match inbound.next().await {
            Some(Ok(())) => continue,
            Some(Err(e)) => {
                debug!(subscriber = %id, error = %e, "Subscriber read failed");
                break;
            }
            None => {
                debug!(subscriber = %id, "Subscriber disconnected");
                break;
            }
        }
    }

    if let Some(tx) = mailbox.upgrade() {
        let _ = tx.send(BroadcastCommand::Unsubscribe(id)).await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
