//! In-memory players for driving a coordinator without sockets.

use std::sync::Arc;

use shed_protocol::{
    CardsSnapshot, Codec, InboundMessage, JsonCodec, OutboundMessage, PlayerId, PlayerInfo,
};
use tokio::sync::mpsc;

use crate::player::{LastSeenCards, Player, Uplink};
use crate::{SendError, SessionError};

/// A player whose "connection" is a pair of in-memory queues.
///
/// Everything the coordinator sends lands in the receiver returned by
/// [`TestPlayer::new`]; [`act`](Self::act) plays the client side by
/// encoding a message and feeding it through [`Player::receive`], the same
/// path a network frame takes.
pub struct TestPlayer {
    info: PlayerInfo,
    outbox: mpsc::Sender<OutboundMessage>,
    uplink: Uplink,
    cards: LastSeenCards,
}

impl TestPlayer {
    /// Creates a player with a send queue of `capacity` messages.
    pub fn new(
        info: PlayerInfo,
        uplink: Uplink,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<OutboundMessage>) {
        let (outbox, inbox) = mpsc::channel(capacity);
        let player = Arc::new(Self {
            info,
            outbox,
            uplink,
            cards: LastSeenCards::default(),
        });
        (player, inbox)
    }

    /// Sends `msg` as if this player's client had written it.
    pub fn act(&self, msg: &InboundMessage) -> Result<(), SessionError> {
        let frame = JsonCodec.encode(msg)?;
        self.receive(&frame)
    }

    /// Reports this player as gone, like a dropped connection would.
    pub async fn leave(&self) {
        self.uplink.leave(self.info.id.clone()).await;
    }
}

impl Player for TestPlayer {
    fn id(&self) -> &PlayerId {
        &self.info.id
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    fn cards(&self) -> CardsSnapshot {
        self.cards.get()
    }

    fn send(&self, msg: OutboundMessage) -> Result<(), SendError> {
        self.cards.observe(&msg);
        self.outbox.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull(self.info.id.clone()),
            mpsc::error::TrySendError::Closed(_) => SendError::Closed(self.info.id.clone()),
        })
    }

    fn receive(&self, frame: &[u8]) -> Result<(), SessionError> {
        let mut msg: InboundMessage = JsonCodec.decode(frame)?;
        msg.player_id = self.info.id.clone();
        self.uplink.deliver(msg)
    }
}
