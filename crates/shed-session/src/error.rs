//! Error types for the session layer.

use shed_protocol::{PlayerId, ProtocolError};

/// Why an outbound message could not be queued for a player.
///
/// Sending never blocks: a full queue means the client is not keeping up,
/// and the session closes the connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The player's bounded send queue is full.
    #[error("send queue full for player {0}")]
    QueueFull(PlayerId),

    /// The player's writer has stopped (connection closed).
    #[error("player {0} is disconnected")]
    Closed(PlayerId),
}

/// Errors raised while handling frames from a player.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The frame did not decode into an inbound message.
    #[error("bad frame: {0}")]
    Decode(#[from] ProtocolError),

    /// The frame exceeded the configured maximum size.
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },

    /// The coordinator's inbound queue is full.
    #[error("coordinator inbound queue is full")]
    InboundFull,

    /// The coordinator has shut down.
    #[error("coordinator is gone")]
    CoordinatorGone,
}

impl SessionError {
    /// Returns `true` if the session cannot continue after this error.
    ///
    /// A malformed frame is only logged; everything else ends the
    /// connection.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decode(_))
    }
}
