//! Player sessions for the Shed server.
//!
//! This crate sits between a raw connection and a game coordinator:
//!
//! 1. **Capability** — the [`Player`] trait is all a coordinator knows
//!    about a seat: identity, a non-blocking send, and a frame sink.
//! 2. **Network players** — [`NetworkPlayer`] runs a reader task and a
//!    writer task per connection, with keep-alive pings, read and write
//!    deadlines, a frame size limit and a bounded send queue.
//! 3. **Test players** — [`TestPlayer`] swaps the connection for
//!    in-memory queues.
//!
//! # How it fits in the stack
//!
//! ```text
//! Coordinator (above)  ← calls Player::send, reads the Uplink channels
//!     ↕
//! Session Layer (this crate)  ← frames ↔ messages, liveness, backpressure
//!     ↕
//! Transport (below)  ← Connection: bytes and pongs
//! ```

mod error;
mod player;
mod session;
mod testing;

pub use error::{SendError, SessionError};
pub use player::{Player, Uplink};
pub use session::{NetworkPlayer, SessionConfig};
pub use testing::TestPlayer;
