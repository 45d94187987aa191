//! Core protocol types for the Shed wire format.
//!
//! This module defines every message that travels "on the wire" between a
//! player's client and the server. Field names follow the JSON schema the
//! clients already speak (`playerID`, `deckCount`, `shouldRespond`, ...),
//! so most fields carry an explicit `#[serde(rename)]`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Card, UnseenCard};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Newtype over the string id the lobby hands out. `#[serde(transparent)]`
/// makes `PlayerId("p1")` serialize as just `"p1"`.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A unique identifier for one game (one table of 2–4 players).
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct GameId(pub String);

impl GameId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for GameId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Public identity of a seated player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
}

impl PlayerInfo {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// What every player may see about an opponent: who they are and their
/// face-up cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opponent {
    pub id: PlayerId,
    pub name: String,
    pub seen: Vec<Card>,
}

/// One player's own view of their three card groups.
///
/// Display-only: face-down cards the player has not turned over are
/// [`UnseenCard::Hidden`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardsSnapshot {
    pub hand: Vec<Card>,
    pub seen: Vec<Card>,
    pub unseen: Vec<UnseenCard>,
}

impl From<&OutboundMessage> for CardsSnapshot {
    fn from(msg: &OutboundMessage) -> Self {
        Self {
            hand: msg.hand.clone(),
            seen: msg.seen.clone(),
            unseen: msg.unseen.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Command — the closed alphabet of the game protocol
// ---------------------------------------------------------------------------

/// Every command the server and clients exchange.
///
/// Serialized as the capitalised variant name (`"PlayHand"`). Inbound
/// messages use the subset a player may answer with; the rest only ever
/// flow outbound.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum Command {
    /// No command: nothing is awaited.
    #[default]
    Null,
    NewJoiner,
    Reorg,
    Start,
    HasStarted,
    Error,
    PlayHand,
    PlaySeen,
    PlayUnseen,
    ReplenishHand,
    Turn,
    EndOfTurn,
    SkipTurn,
    Burn,
    UnseenSuccess,
    UnseenFailure,
    PlayerFinished,
    GameOver,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A player → server message.
///
/// `decision` carries indices into whichever card group the awaited
/// command refers to (hand, face-up, face-down, or hand ‖ face-up for a
/// reorganisation). It is empty for pure acknowledgements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "playerID")]
    pub player_id: PlayerId,
    pub command: Command,
    #[serde(default)]
    pub decision: Vec<usize>,
}

impl InboundMessage {
    pub fn new(player_id: impl Into<PlayerId>, command: Command) -> Self {
        Self {
            player_id: player_id.into(),
            command,
            decision: Vec::new(),
        }
    }

    pub fn with_decision(mut self, decision: Vec<usize>) -> Self {
        self.decision = decision;
        self
    }
}

/// A server → player message.
///
/// Every message is addressed to exactly one player and carries that
/// player's complete view of the table, so a client can redraw from any
/// single message. Optional fields are omitted from the JSON when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// The recipient.
    #[serde(rename = "playerID")]
    pub player_id: PlayerId,
    pub command: Command,
    /// The recipient's display name.
    #[serde(default)]
    pub name: String,
    /// Human-readable description of what happened.
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub hand: Vec<Card>,
    /// Face-up cards.
    #[serde(default)]
    pub seen: Vec<Card>,
    /// Face-down cards, hidden unless already turned over.
    #[serde(default)]
    pub unseen: Vec<UnseenCard>,
    #[serde(default)]
    pub pile: Vec<Card>,
    #[serde(rename = "deckCount", default)]
    pub deck_count: usize,
    /// `true` if the recipient must answer with `command`.
    #[serde(rename = "shouldRespond", default)]
    pub should_respond: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joiner: Option<PlayerInfo>,
    #[serde(
        rename = "currentTurn",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_turn: Option<PlayerInfo>,
    /// Legal card indices for the recipient's move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moves: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponents: Option<Vec<Opponent>>,
    #[serde(
        rename = "finishedPlayers",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub finished_players: Option<Vec<PlayerInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutboundMessage {
    /// A bare message with every optional field empty.
    pub fn new(player_id: PlayerId, command: Command) -> Self {
        Self {
            player_id,
            command,
            ..Self::default()
        }
    }

    /// An `Error` message carrying `error` for one player.
    pub fn error(player_id: PlayerId, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            player_id,
            command: Command::Error,
            message: error.clone(),
            error: Some(error),
            ..Self::default()
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
