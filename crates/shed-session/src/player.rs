//! The player capability the coordinator talks to, and the uplink players
//! use to talk back.

use std::sync::{Mutex, PoisonError};

use shed_protocol::{
    CardsSnapshot, Command, InboundMessage, OutboundMessage, PlayerId, PlayerInfo,
};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::{SendError, SessionError};

/// A seated player, as seen by the coordinator.
///
/// Implementations exist for network-backed players
/// ([`NetworkPlayer`](crate::NetworkPlayer)) and in-memory players for
/// tests ([`TestPlayer`](crate::TestPlayer)). Every method is
/// non-blocking, so the coordinator can call them from its event loop.
pub trait Player: Send + Sync + 'static {
    fn id(&self) -> &PlayerId;

    fn name(&self) -> &str;

    fn info(&self) -> PlayerInfo {
        PlayerInfo::new(self.id().clone(), self.name())
    }

    /// The player's cards as of the last message they were sent. For
    /// display only.
    fn cards(&self) -> CardsSnapshot;

    /// Queues `msg` for delivery without waiting.
    fn send(&self, msg: OutboundMessage) -> Result<(), SendError>;

    /// Hands a raw frame from the player's client to the session, which
    /// decodes it and forwards it to the coordinator.
    fn receive(&self, frame: &[u8]) -> Result<(), SessionError>;
}

/// A player session's link to its game coordinator: where inbound
/// messages go, and where the session reports that it has left.
#[derive(Debug, Clone)]
pub struct Uplink {
    inbound: mpsc::Sender<InboundMessage>,
    leave: mpsc::Sender<PlayerId>,
}

impl Uplink {
    pub fn new(inbound: mpsc::Sender<InboundMessage>, leave: mpsc::Sender<PlayerId>) -> Self {
        Self { inbound, leave }
    }

    /// Forwards one inbound message without waiting.
    pub fn deliver(&self, msg: InboundMessage) -> Result<(), SessionError> {
        self.inbound.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SessionError::InboundFull,
            TrySendError::Closed(_) => SessionError::CoordinatorGone,
        })
    }

    /// Reports that `player_id` has gone. A coordinator that is already
    /// gone does not need telling.
    pub async fn leave(&self, player_id: PlayerId) {
        if self.leave.send(player_id).await.is_err() {
            tracing::debug!("coordinator gone before leave");
        }
    }
}

/// The card groups last shown to a player, kept for [`Player::cards`].
#[derive(Debug, Default)]
pub(crate) struct LastSeenCards(Mutex<CardsSnapshot>);

impl LastSeenCards {
    /// Records the view carried by `msg`. Lobby notices and bare errors
    /// carry no cards and leave the record alone.
    pub(crate) fn observe(&self, msg: &OutboundMessage) {
        if matches!(msg.command, Command::NewJoiner | Command::Error) {
            return;
        }
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = CardsSnapshot::from(msg);
    }

    pub(crate) fn get(&self) -> CardsSnapshot {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
