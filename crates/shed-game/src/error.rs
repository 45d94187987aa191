//! Error types for the rule engine.

use shed_protocol::{Command, PlayerId};

/// Errors returned by the [`Shed`](crate::Shed) engine.
///
/// The engine never mutates its state when it returns one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    // -- Construction --
    /// Fewer than two players at start.
    #[error("too few players: need at least {min}, got {got}")]
    TooFewPlayers { min: usize, got: usize },

    /// More than four players at start.
    #[error("too many players: at most {max}, got {got}")]
    TooManyPlayers { max: usize, got: usize },

    /// The same player id appears twice in the seating list.
    #[error("player {0} is seated twice")]
    DuplicatePlayer(PlayerId),

    // -- Protocol (caller bugs) --
    /// `next` or `receive_response` called before `start`.
    #[error("game has not started")]
    NotStarted,

    /// `receive_response` called while no response is awaited.
    #[error("game was not expecting a response")]
    UnexpectedResponse,

    /// `next` called while a response is still awaited.
    #[error("game is awaiting a {0} response")]
    AwaitingResponse(Command),

    // -- Routing --
    /// A response came from someone other than the current player.
    #[error("it is not {player}'s turn")]
    NotYourTurn { player: PlayerId },

    /// A response carried a command other than the awaited one.
    #[error("expected {expected} from {player}, got {got}")]
    UnexpectedCommand {
        player: PlayerId,
        expected: Command,
        got: Command,
    },

    /// A response named a player who is not seated in this game.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// A batched response had the wrong number of messages.
    #[error("expected {expected} responses, got {got}")]
    ResponseCount { expected: usize, got: usize },

    // -- Gameplay --
    /// The chosen cards are not a legal play (mismatched ranks, bad
    /// indices, or a card that cannot go on the pile).
    #[error("invalid move")]
    InvalidMove,

    /// A reorganisation did not pick three distinct cards out of the
    /// player's hand and face-up cards.
    #[error("invalid reorganisation from {0}")]
    InvalidReorg(PlayerId),

    /// A face-down play must choose exactly one card.
    #[error("must play exactly one face-down card")]
    PlayOneCard,

    /// A `PlayerCards` value broke one of its invariants.
    #[error("invalid player cards: {0}")]
    InvalidCards(String),
}

impl GameError {
    /// Returns `true` for errors a player caused (as opposed to bugs in
    /// whatever is driving the engine).
    pub fn is_player_error(&self) -> bool {
        matches!(
            self,
            Self::NotYourTurn { .. }
                | Self::UnexpectedCommand { .. }
                | Self::UnknownPlayer(_)
                | Self::InvalidMove
                | Self::InvalidReorg(_)
                | Self::PlayOneCard
        )
    }
}
