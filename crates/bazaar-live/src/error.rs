//! # Live Update Error Types
//!
//! Error types for the broadcaster and its connections.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Live Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────────┐  ┌─────────────────────┐  ┌─────────────────┐ │
//! │  │   Actor mailbox     │  │   Connection        │  │   Deadline      │ │
//! │  │                     │  │                     │  │                 │ │
//! │  │  ChannelError       │  │  SendFailed         │  │  SendTimeout    │ │
//! │  │  (actor gone)       │  │  ReceiveFailed      │  │                 │ │
//! │  └─────────────────────┘  └─────────────────────┘  └─────────────────┘ │
//! │                                                                         │
//! │  Only ChannelError ever reaches a caller of BroadcasterHandle. The     │
//! │  others stay inside the actor and end in a pruned subscriber.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use thiserror::Error;

/// Result type alias for live update operations.
pub type LiveResult<T> = Result<T, LiveError>;

/// Failures of the broadcaster and of individual subscriber connections.
#[derive(Debug, Error)]
pub enum LiveError {
    /// The broadcaster actor has stopped and no longer accepts messages.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Writing to a subscriber failed.
    #[error("Send to subscriber failed: {0}")]
    SendFailed(String),

    /// Reading from a subscriber failed.
    #[error("Receive from subscriber failed: {0}")]
    ReceiveFailed(String),

    /// Writing to a subscriber exceeded its deadline.
    #[error("Send to subscriber timed out after {0:?}")]
    SendTimeout(Duration),
}

impl LiveError {
    /// Returns true if the broadcaster itself is gone, as opposed to a
    /// single subscriber misbehaving.
    pub fn is_closed(&self) -> bool {
        matches!(self, LiveError::ChannelError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_closed() {
        assert!(LiveError::ChannelError("gone".into()).is_closed());
        assert!(!LiveError::SendFailed("reset".into()).is_closed());
        assert!(!LiveError::SendTimeout(Duration::from_secs(2)).is_closed());
    }

    #[test]
    fn test_error_display() {
        let err = LiveError::SendTimeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Send to subscriber timed out after 1.5s");
    }
}
