//! The `Game` trait: what a coordinator needs from a rule engine.

use shed_game::{GameError, PlayState, Shed};
use shed_protocol::{Command, InboundMessage, OutboundMessage, PlayerId, PlayerInfo};

/// A turn-based engine the coordinator can drive.
///
/// The coordinator alternates between asking the engine for its next
/// prompt ([`next`](Game::next)) and handing it the players' answers
/// ([`receive_response`](Game::receive_response)). Every call returns the
/// messages to fan out; the engine never talks to players itself.
pub trait Game: Send + 'static {
    /// Seats `players` and deals. Returns the start broadcast.
    fn start(&mut self, players: Vec<PlayerInfo>) -> Result<Vec<OutboundMessage>, GameError>;

    /// Advances to the next prompt.
    fn next(&mut self) -> Result<Vec<OutboundMessage>, GameError>;

    /// Applies the answers to the last prompt.
    fn receive_response(
        &mut self,
        msgs: &[InboundMessage],
    ) -> Result<Vec<OutboundMessage>, GameError>;

    /// Checks a single `Reorg` answer before it joins the batch. Default:
    /// accept everything and let [`receive_response`](Game::receive_response)
    /// judge the batch.
    fn validate_reorg(&self, _msg: &InboundMessage) -> Result<(), GameError> {
        Ok(())
    }

    /// Messages telling players about a rejected response. Default: none.
    fn rejection_messages(&self, _err: &GameError, _offender: &PlayerId) -> Vec<OutboundMessage> {
        Vec::new()
    }

    /// The command the engine waits for, or [`Command::Null`].
    fn awaited_command(&self) -> Command;

    fn play_state(&self) -> PlayState;
}

impl Game for Shed {
    fn start(&mut self, players: Vec<PlayerInfo>) -> Result<Vec<OutboundMessage>, GameError> {
        Shed::start(self, players)
    }

    fn next(&mut self) -> Result<Vec<OutboundMessage>, GameError> {
        Shed::next(self)
    }

    fn receive_response(
        &mut self,
        msgs: &[InboundMessage],
    ) -> Result<Vec<OutboundMessage>, GameError> {
        Shed::receive_response(self, msgs)
    }

    fn validate_reorg(&self, msg: &InboundMessage) -> Result<(), GameError> {
        Shed::validate_reorg(self, msg)
    }

    fn rejection_messages(&self, err: &GameError, offender: &PlayerId) -> Vec<OutboundMessage> {
        Shed::rejection_messages(self, err, offender)
    }

    fn awaited_command(&self) -> Command {
        Shed::awaited_command(self)
    }

    fn play_state(&self) -> PlayState {
        Shed::play_state(self)
    }
}
