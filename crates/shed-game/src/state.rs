//! Game phase enums.

use std::fmt;

/// Phase of a game.
///
/// ```text
/// PreGame ──(all reorgs in)──→ ClearDeck ──(deck drained)──→ ClearCards
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stage {
    /// Players swap cards between hand and face-up.
    #[default]
    PreGame,
    /// The draw pile still has cards; hands are replenished after plays.
    ClearDeck,
    /// The draw pile is empty; players work through hand, face-up, then
    /// face-down cards.
    ClearCards,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Lifecycle of a game as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayState {
    /// Players may still join.
    #[default]
    Idle,
    InProgress,
    /// At most one player is left competing.
    Over,
}

impl PlayState {
    /// Returns `true` if new players may join.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
