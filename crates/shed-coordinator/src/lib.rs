//! Game coordination for the Shed server.
//!
//! Each game runs as an isolated Tokio task (actor model) that owns the
//! rule engine, the seated players and the queues between them.
//!
//! # Key types
//!
//! - [`Game`] — what the coordinator needs from a rule engine
//! - [`CoordinatorHandle`] — talk to a running coordinator
//! - [`GameRegistry`] — creates, finds and retires games
//! - [`CoordinatorConfig`] — seat limits, settle delay, channel sizes

mod config;
mod coordinator;
mod error;
mod game;
mod registry;

pub use config::CoordinatorConfig;
pub use coordinator::{CoordinatorHandle, GameInfo, spawn_coordinator};
pub use error::{CoordinatorError, RegistryError};
pub use game::Game;
pub use registry::GameRegistry;
