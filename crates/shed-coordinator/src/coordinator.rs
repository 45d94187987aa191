//! Game coordinator: an isolated Tokio task that owns one game.
//!
//! Everything that changes the game goes through the coordinator's event
//! loop, so the engine never needs a lock:
//!
//! ```text
//!  CoordinatorHandle ──commands──┐
//!  players' Uplink ──inbound─────┤
//!  players' Uplink ──leave───────┼──→ event loop ──→ Player::send
//!  (internal) ──steps────────────┤        │
//!  (internal) ──outbound─────────┘        └──→ watch<PlayState>
//! ```
//!
//! A *step* either asks the engine for its next prompt or hands it a batch
//! of responses. The resulting messages come back round as an *outbound*
//! batch; once that is fanned out, and the engine is waiting on nobody,
//! the loop queues the next step itself.

use std::sync::Arc;

use shed_game::{GameError, PlayState};
use shed_protocol::{Command, GameId, InboundMessage, OutboundMessage, PlayerId, PlayerInfo};
use shed_session::{Player, SendError, Uplink};
use tokio::sync::{mpsc, oneshot, watch};

use crate::{CoordinatorConfig, CoordinatorError, Game};

/// Requests from a [`CoordinatorHandle`].
enum CoordinatorCommand {
    Register {
        player: Arc<dyn Player>,
        reply: oneshot::Sender<Result<(), CoordinatorError>>,
    },
    CheckJoin {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), CoordinatorError>>,
    },
    Info {
        reply: oneshot::Sender<GameInfo>,
    },
    Shutdown,
}

/// Work for the engine.
#[derive(Debug)]
enum Step {
    /// Ask for the next prompt.
    Next,
    /// Apply these responses to the current prompt.
    Respond(Vec<InboundMessage>),
}

/// A snapshot of game metadata (not the cards).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInfo {
    pub game_id: GameId,
    pub play_state: PlayState,
    /// Seats taken, including players who have since disconnected.
    pub player_count: usize,
    pub max_players: usize,
}

/// Handle to a running coordinator.
///
/// Cheap to clone. The [`GameRegistry`](crate::GameRegistry) holds one per
/// game; the coordinator stops once every handle is dropped.
#[derive(Clone)]
pub struct CoordinatorHandle {
    game_id: GameId,
    commands: mpsc::Sender<CoordinatorCommand>,
    uplink: Uplink,
    state: watch::Receiver<PlayState>,
}

impl CoordinatorHandle {
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// The channels a player session uses to reach this coordinator.
    pub fn uplink(&self) -> Uplink {
        self.uplink.clone()
    }

    /// The game's current state, as last published by the coordinator.
    pub fn play_state(&self) -> PlayState {
        *self.state.borrow()
    }

    /// A receiver that sees every state change.
    pub fn watch_state(&self) -> watch::Receiver<PlayState> {
        self.state.clone()
    }

    /// Returns `true` once the coordinator task has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Seats `player` at the table. Existing players are told about the
    /// newcomer.
    pub async fn register(&self, player: Arc<dyn Player>) -> Result<(), CoordinatorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(CoordinatorCommand::Register {
                player,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Reports whether [`register`](Self::register) would currently seat
    /// `player_id`, without seating anyone.
    pub async fn check_join(&self, player_id: &PlayerId) -> Result<(), CoordinatorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(CoordinatorCommand::CheckJoin {
                player_id: player_id.clone(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn info(&self) -> Result<GameInfo, CoordinatorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(CoordinatorCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the coordinator to stop.
    pub async fn shutdown(&self) -> Result<(), CoordinatorError> {
        self.commands
            .send(CoordinatorCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> CoordinatorError {
        CoordinatorError::Unavailable(self.game_id.clone())
    }
}

impl std::fmt::Debug for CoordinatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorHandle")
            .field("game_id", &self.game_id)
            .field("play_state", &self.play_state())
            .finish()
    }
}

/// One place at the table. The session is dropped when the player
/// leaves mid-game, but the seat stays so the engine's seating holds.
struct Seat {
    info: PlayerInfo,
    player: Option<Arc<dyn Player>>,
}

/// The coordinator's state. Runs inside a Tokio task.
struct Coordinator<G: Game> {
    game_id: GameId,
    config: CoordinatorConfig,
    game: G,
    seats: Vec<Seat>,
    /// Reorganisation answers gathered until every seat has replied.
    reorgs: Vec<InboundMessage>,
    commands: mpsc::Receiver<CoordinatorCommand>,
    inbound: mpsc::Receiver<InboundMessage>,
    leaves: mpsc::Receiver<PlayerId>,
    steps_tx: mpsc::UnboundedSender<Step>,
    steps: mpsc::UnboundedReceiver<Step>,
    outbound_tx: mpsc::UnboundedSender<Vec<OutboundMessage>>,
    outbound: mpsc::UnboundedReceiver<Vec<OutboundMessage>>,
    state: watch::Sender<PlayState>,
}

impl<G: Game> Coordinator<G> {
    /// Runs the event loop until shutdown, until every handle is gone, or
    /// until a started game has no one left at the table.
    async fn run(mut self) {
        tracing::info!(game_id = %self.game_id, "coordinator started");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(CoordinatorCommand::Register { player, reply }) => {
                        let result = self.handle_register(player);
                        let _ = reply.send(result);
                    }
                    Some(CoordinatorCommand::CheckJoin { player_id, reply }) => {
                        let _ = reply.send(self.check_join(&player_id));
                    }
                    Some(CoordinatorCommand::Info { reply }) => {
                        let _ = reply.send(self.info());
                    }
                    Some(CoordinatorCommand::Shutdown) | None => break,
                },
                Some(player_id) = self.leaves.recv() => {
                    self.handle_leave(player_id);
                    if self.is_abandoned() {
                        tracing::info!(game_id = %self.game_id, "every player has left");
                        break;
                    }
                }
                Some(msg) = self.inbound.recv() => self.handle_inbound(msg),
                Some(step) = self.steps.recv() => self.handle_step(step),
                Some(batch) = self.outbound.recv() => self.handle_outbound(batch),
            }
        }

        tracing::info!(game_id = %self.game_id, "coordinator stopped");
    }

    fn check_join(&self, player_id: &PlayerId) -> Result<(), CoordinatorError> {
        if !self.game.play_state().is_joinable() {
            return Err(CoordinatorError::GameAlreadyStarted(self.game_id.clone()));
        }
        if self.seat_index(player_id).is_some() {
            return Err(CoordinatorError::AlreadyJoined(
                player_id.clone(),
                self.game_id.clone(),
            ));
        }
        if self.seats.len() >= self.config.max_players {
            return Err(CoordinatorError::GameFull(self.game_id.clone()));
        }
        Ok(())
    }

    fn handle_register(&mut self, player: Arc<dyn Player>) -> Result<(), CoordinatorError> {
        let info = player.info();
        self.check_join(&info.id)?;

        let notice = format!("{} has joined the game", info.name);
        for seat in &self.seats {
            let msg = OutboundMessage {
                name: seat.info.name.clone(),
                message: notice.clone(),
                joiner: Some(info.clone()),
                ..OutboundMessage::new(seat.info.id.clone(), Command::NewJoiner)
            };
            self.send_to(seat, msg);
        }

        tracing::info!(
            game_id = %self.game_id,
            player_id = %info.id,
            players = self.seats.len() + 1,
            "player joined"
        );
        self.seats.push(Seat {
            info,
            player: Some(player),
        });
        Ok(())
    }

    /// Before the game starts a leaver gives up their seat. Afterwards the
    /// seat is kept and only the session is dropped.
    fn handle_leave(&mut self, player_id: PlayerId) {
        let Some(index) = self.seat_index(&player_id) else {
            tracing::debug!(game_id = %self.game_id, %player_id, "leave from unknown player");
            return;
        };

        if self.game.play_state().is_joinable() {
            self.seats.remove(index);
        } else {
            self.seats[index].player = None;
        }
        tracing::info!(
            game_id = %self.game_id,
            %player_id,
            state = %self.game.play_state(),
            "player left"
        );
    }

    fn is_abandoned(&self) -> bool {
        self.game.play_state() == PlayState::InProgress
            && self.seats.iter().all(|seat| seat.player.is_none())
    }

    fn handle_inbound(&mut self, msg: InboundMessage) {
        if self.seat_index(&msg.player_id).is_none() {
            tracing::warn!(
                game_id = %self.game_id,
                player_id = %msg.player_id,
                "message from non-member, ignoring"
            );
            return;
        }

        if msg.command == Command::Start {
            self.handle_start(&msg.player_id);
            return;
        }

        let awaited = self.game.awaited_command();
        if msg.command != awaited {
            tracing::debug!(
                game_id = %self.game_id,
                player_id = %msg.player_id,
                command = %msg.command,
                %awaited,
                "rejecting unexpected command"
            );
            let err = GameError::UnexpectedCommand {
                player: msg.player_id.clone(),
                expected: awaited,
                got: msg.command,
            };
            let rejections = self.game.rejection_messages(&err, &msg.player_id);
            self.fan_out(rejections);
            return;
        }

        if awaited == Command::Reorg {
            // A player may change their mind until the batch goes in.
            self.reorgs.retain(|m| m.player_id != msg.player_id);
            if let Err(e) = self.game.validate_reorg(&msg) {
                tracing::debug!(
                    game_id = %self.game_id,
                    player_id = %msg.player_id,
                    error = %e,
                    "reorganisation rejected"
                );
                let rejections = self.game.rejection_messages(&e, &msg.player_id);
                self.fan_out(rejections);
                return;
            }
            self.reorgs.push(msg);
            if self.reorgs.len() == self.seats.len() {
                let batch = std::mem::take(&mut self.reorgs);
                self.queue(Step::Respond(batch));
            }
            return;
        }

        self.queue(Step::Respond(vec![msg]));
    }

    fn handle_start(&mut self, requester: &PlayerId) {
        if !self.game.play_state().is_joinable() {
            tracing::debug!(game_id = %self.game_id, %requester, "start after game began, ignoring");
            return;
        }
        if self.seats.len() < self.config.min_players {
            let text = format!(
                "need at least {} players to start, have {}",
                self.config.min_players,
                self.seats.len()
            );
            self.send_to_id(requester, OutboundMessage::error(requester.clone(), text));
            return;
        }

        let players: Vec<PlayerInfo> = self.seats.iter().map(|seat| seat.info.clone()).collect();
        match self.game.start(players) {
            Ok(batch) => {
                tracing::info!(
                    game_id = %self.game_id,
                    %requester,
                    players = self.seats.len(),
                    "game started"
                );
                self.publish_state();
                // Straight out rather than through the outbound channel:
                // the first prompt waits for the settle delay instead.
                self.fan_out(batch);

                let steps = self.steps_tx.clone();
                let delay = self.config.settle_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = steps.send(Step::Next);
                });
            }
            Err(e) => {
                tracing::warn!(game_id = %self.game_id, error = %e, "failed to start game");
                self.send_to_id(requester, OutboundMessage::error(requester.clone(), e.to_string()));
            }
        }
    }

    fn handle_step(&mut self, step: Step) {
        let (result, offender) = match step {
            Step::Next => (self.game.next(), None),
            Step::Respond(msgs) => {
                let offender = msgs.first().map(|m| m.player_id.clone());
                (self.game.receive_response(&msgs), offender)
            }
        };

        if self.game.awaited_command() != Command::Reorg {
            self.reorgs.clear();
        }

        match result {
            Ok(batch) => {
                let _ = self.outbound_tx.send(batch);
            }
            Err(e) => match offender {
                Some(player_id) => {
                    tracing::debug!(
                        game_id = %self.game_id,
                        %player_id,
                        error = %e,
                        "response rejected"
                    );
                    let rejections = self.game.rejection_messages(&e, &player_id);
                    self.fan_out(rejections);
                }
                None => {
                    tracing::error!(game_id = %self.game_id, error = %e, "engine refused to advance");
                }
            },
        }
    }

    fn handle_outbound(&mut self, batch: Vec<OutboundMessage>) {
        self.publish_state();
        self.fan_out(batch);

        if self.game.play_state() == PlayState::InProgress
            && self.game.awaited_command() == Command::Null
        {
            self.queue(Step::Next);
        }
    }

    fn queue(&self, step: Step) {
        // The receiver lives in `self`, so this cannot fail while we run.
        let _ = self.steps_tx.send(step);
    }

    fn publish_state(&self) {
        let play_state = self.game.play_state();
        let changed = self.state.send_if_modified(|current| {
            if *current == play_state {
                return false;
            }
            *current = play_state;
            true
        });
        if changed && play_state == PlayState::Over {
            tracing::info!(game_id = %self.game_id, "game over");
        }
    }

    /// Delivers each message to the seat it is addressed to.
    fn fan_out(&self, batch: Vec<OutboundMessage>) {
        for msg in batch {
            let player_id = msg.player_id.clone();
            match self.seat_index(&player_id) {
                Some(index) => self.send_to(&self.seats[index], msg),
                None => {
                    tracing::debug!(game_id = %self.game_id, %player_id, "no seat for message");
                }
            }
        }
    }

    fn send_to_id(&self, player_id: &PlayerId, msg: OutboundMessage) {
        if let Some(index) = self.seat_index(player_id) {
            self.send_to(&self.seats[index], msg);
        }
    }

    /// Sends without waiting. Drops the message if the player has left.
    fn send_to(&self, seat: &Seat, msg: OutboundMessage) {
        let Some(player) = &seat.player else {
            return;
        };
        match player.send(msg) {
            Ok(()) => {}
            Err(e @ SendError::QueueFull(_)) => {
                tracing::warn!(game_id = %self.game_id, error = %e, "message dropped");
            }
            Err(e @ SendError::Closed(_)) => {
                tracing::debug!(game_id = %self.game_id, error = %e, "message dropped");
            }
        }
    }

    fn seat_index(&self, player_id: &PlayerId) -> Option<usize> {
        self.seats.iter().position(|seat| seat.info.id == *player_id)
    }

    fn info(&self) -> GameInfo {
        GameInfo {
            game_id: self.game_id.clone(),
            play_state: self.game.play_state(),
            player_count: self.seats.len(),
            max_players: self.config.max_players,
        }
    }
}

/// Spawns a coordinator task for `game` and returns a handle to it.
pub fn spawn_coordinator<G: Game>(
    game_id: GameId,
    game: G,
    config: CoordinatorConfig,
) -> CoordinatorHandle {
    let (commands_tx, commands) = mpsc::channel(config.channel_size);
    let (inbound_tx, inbound) = mpsc::channel(config.channel_size);
    let (leave_tx, leaves) = mpsc::channel(config.channel_size);
    let (steps_tx, steps) = mpsc::unbounded_channel();
    let (outbound_tx, outbound) = mpsc::unbounded_channel();
    let (state, state_rx) = watch::channel(game.play_state());

    let coordinator = Coordinator {
        game_id: game_id.clone(),
        config,
        game,
        seats: Vec::new(),
        reorgs: Vec::new(),
        commands,
        inbound,
        leaves,
        steps_tx,
        steps,
        outbound_tx,
        outbound,
        state,
    };

    tokio::spawn(coordinator.run());

    CoordinatorHandle {
        game_id,
        commands: commands_tx,
        uplink: Uplink::new(inbound_tx, leave_tx),
        state: state_rx,
    }
}
