//! # Shed
//!
//! A server for the multiplayer card game Shed.
//!
//! Players connect over WebSocket to the join path with their game and
//! player ids in the query string. The first connection to an unknown game
//! id opens its lobby; any seated player may then ask to start. From there
//! the server runs the game: it prompts whoever must act, checks every
//! answer against the rules and tells each player what they may see.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shed::prelude::*;
//!
//! # async fn run() -> Result<(), ShedError> {
//! let server = ShedServer::builder()
//!     .config(ServerConfig::from_env())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{LISTEN_ADDR_ENV, ServerConfig};
pub use error::ShedError;
pub use server::{ShedServer, ShedServerBuilder};

/// The types most servers and clients need.
pub mod prelude {
    pub use crate::{ServerConfig, ShedError, ShedServer, ShedServerBuilder};
    pub use shed_coordinator::{CoordinatorConfig, GameRegistry};
    pub use shed_game::{PlayState, Shed};
    pub use shed_protocol::{
        Card, Command, GameId, InboundMessage, OutboundMessage, PlayerId, PlayerInfo, Rank, Suit,
    };
    pub use shed_session::SessionConfig;
}
