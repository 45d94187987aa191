//! Error types for the coordinator layer.

use shed_protocol::{GameId, PlayerId};

/// Errors returned by a [`CoordinatorHandle`](crate::CoordinatorHandle).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    /// The game has left its lobby; no more joins.
    #[error("game {0} has already started")]
    GameAlreadyStarted(GameId),

    /// Every seat is taken.
    #[error("game {0} is full")]
    GameFull(GameId),

    /// The player already holds a seat.
    #[error("player {0} already in game {1}")]
    AlreadyJoined(PlayerId, GameId),

    /// The coordinator task has stopped or its channel is closed.
    #[error("game {0} is unavailable")]
    Unavailable(GameId),
}

/// Errors returned by the [`GameRegistry`](crate::GameRegistry).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("game {0} not found")]
    NotFound(GameId),

    #[error("game {0} already exists")]
    DuplicateGame(GameId),

    /// Lobby changes are only accepted before the game starts.
    #[error("game {0} has already started")]
    GameAlreadyStarted(GameId),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_wraps_coordinator_error() {
        let err: RegistryError = CoordinatorError::GameFull(GameId::from("g1")).into();
        assert_eq!(err.to_string(), "game g1 is full");
    }
}
