//! Unified error type for the Shed server.

use shed_coordinator::{CoordinatorError, RegistryError};
use shed_game::GameError;
use shed_protocol::ProtocolError;
use shed_session::SessionError;
use shed_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so
/// the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ShedError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A rule-engine error.
    #[error(transparent)]
    Game(#[from] GameError),

    /// A player-session error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A coordinator error (full, started, gone).
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    /// A registry error (unknown or duplicate game).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The upgrade request did not say which game and player it is for.
    #[error("bad join request: {0}")]
    BadRequest(String),
}
