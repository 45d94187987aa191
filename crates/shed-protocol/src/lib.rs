//! Wire protocol for the Shed server.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`InboundMessage`], [`OutboundMessage`], [`Command`],
//!   [`Card`], ...) — the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the game
//! engine. It doesn't know about connections or turns; it only knows how
//! to serialize and deserialize messages.
//!
//! ```text
//! Transport (bytes) → Protocol (messages) → Session → Coordinator → Engine
//! ```

mod card;
mod codec;
mod error;
mod types;

pub use card::{Card, Rank, Suit, UnseenCard};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    CardsSnapshot, Command, GameId, InboundMessage, Opponent, OutboundMessage, PlayerId,
    PlayerInfo,
};
