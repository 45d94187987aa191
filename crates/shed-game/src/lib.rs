//! Rule engine for Shed.
//!
//! - [`Deck`]: the shuffled draw pile.
//! - [`rules`]: legal moves and burn detection over a pile.
//! - [`PlayerCards`]: one player's hand, face-up and face-down groups.
//! - [`Shed`]: the state machine that runs a game.
//!
//! The engine is synchronous and owns no tasks. Something else (the
//! session coordinator) decides when to call [`Shed::next`] and
//! [`Shed::receive_response`].

mod deck;
mod engine;
mod error;
mod player_cards;
pub mod rules;
mod state;

pub use deck::{DECK_SIZE, Deck};
pub use engine::{MAX_PLAYERS, MIN_PLAYERS, Shed};
pub use error::GameError;
pub use player_cards::{CardGroup, GROUP_SIZE, PlayerCards};
pub use state::{PlayState, Stage};
