//! The game registry: every game the server knows about, keyed by id.

use std::collections::HashMap;
use std::sync::Arc;

use shed_game::PlayState;
use shed_protocol::{GameId, PlayerId, PlayerInfo};
use shed_session::Player;

use crate::{CoordinatorConfig, CoordinatorHandle, Game, RegistryError, spawn_coordinator};

/// Tracks running games and the players expected to join them.
///
/// A game is *pending* while its coordinator is still in the lobby and
/// *active* once play has begun. Players can be announced to a pending
/// game ahead of connecting; they stay listed until they take a seat.
pub struct GameRegistry {
    games: HashMap<GameId, CoordinatorHandle>,
    pending_players: HashMap<GameId, Vec<PlayerInfo>>,
    config: CoordinatorConfig,
}

impl GameRegistry {
    /// Creates an empty registry. Games spawned through
    /// [`create_game`](Self::create_game) use `config`.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            games: HashMap::new(),
            pending_players: HashMap::new(),
            config,
        }
    }

    /// Spawns a coordinator for `game` and registers it as pending.
    pub fn create_game<G: Game>(
        &mut self,
        game_id: GameId,
        game: G,
    ) -> Result<CoordinatorHandle, RegistryError> {
        if self.games.contains_key(&game_id) {
            return Err(RegistryError::DuplicateGame(game_id));
        }
        let handle = spawn_coordinator(game_id, game, self.config.clone());
        self.add_pending_game(handle.clone())?;
        Ok(handle)
    }

    /// Registers an already running coordinator.
    pub fn add_pending_game(&mut self, handle: CoordinatorHandle) -> Result<(), RegistryError> {
        let game_id = handle.game_id().clone();
        if self.games.contains_key(&game_id) {
            return Err(RegistryError::DuplicateGame(game_id));
        }
        tracing::info!(%game_id, "game registered");
        self.games.insert(game_id, handle);
        Ok(())
    }

    /// A game that is still in its lobby.
    pub fn find_pending(&self, game_id: &GameId) -> Option<CoordinatorHandle> {
        self.find_in(game_id, PlayState::Idle)
    }

    /// A game that is being played.
    pub fn find_active(&self, game_id: &GameId) -> Option<CoordinatorHandle> {
        self.find_in(game_id, PlayState::InProgress)
    }

    fn find_in(&self, game_id: &GameId, play_state: PlayState) -> Option<CoordinatorHandle> {
        self.games
            .get(game_id)
            .filter(|handle| !handle.is_closed() && handle.play_state() == play_state)
            .cloned()
    }

    /// A player announced to `game_id` who has not taken their seat yet.
    pub fn find_pending_player(&self, game_id: &GameId, player_id: &PlayerId) -> Option<PlayerInfo> {
        self.pending_players
            .get(game_id)?
            .iter()
            .find(|info| info.id == *player_id)
            .cloned()
    }

    /// Announces a player to a pending game. Announcing the same id again
    /// updates the name.
    pub fn add_pending_player(
        &mut self,
        game_id: &GameId,
        player: PlayerInfo,
    ) -> Result<(), RegistryError> {
        let handle = self
            .games
            .get(game_id)
            .ok_or_else(|| RegistryError::NotFound(game_id.clone()))?;
        if !handle.play_state().is_joinable() {
            return Err(RegistryError::GameAlreadyStarted(game_id.clone()));
        }

        let pending = self.pending_players.entry(game_id.clone()).or_default();
        match pending.iter_mut().find(|info| info.id == player.id) {
            Some(existing) => existing.name = player.name,
            None => pending.push(player),
        }
        Ok(())
    }

    /// Takes a player off the pending list. Returns whether they were on it.
    pub fn remove_pending_player(&mut self, game_id: &GameId, player_id: &PlayerId) -> bool {
        let Some(pending) = self.pending_players.get_mut(game_id) else {
            return false;
        };
        let before = pending.len();
        pending.retain(|info| info.id != *player_id);
        let removed = pending.len() != before;
        if pending.is_empty() {
            self.pending_players.remove(game_id);
        }
        removed
    }

    /// Seats a connected player at the game's table. The player leaves the
    /// pending list whether or not the coordinator accepts them.
    pub async fn add_player_to_game(
        &mut self,
        game_id: &GameId,
        player: Arc<dyn Player>,
    ) -> Result<(), RegistryError> {
        let handle = self
            .games
            .get(game_id)
            .ok_or_else(|| RegistryError::NotFound(game_id.clone()))?
            .clone();
        let player_id = player.id().clone();
        let seated = handle.register(player).await;
        self.remove_pending_player(game_id, &player_id);
        seated.map_err(RegistryError::from)
    }

    /// Removes a game and stops its coordinator.
    pub async fn remove_game(&mut self, game_id: &GameId) -> Option<CoordinatorHandle> {
        self.pending_players.remove(game_id);
        let handle = self.games.remove(game_id)?;
        if handle.shutdown().await.is_err() {
            tracing::debug!(%game_id, "coordinator already stopped");
        }
        tracing::info!(%game_id, "game removed");
        Some(handle)
    }

    /// Forgets games that are over or whose coordinator has stopped.
    /// Returns their ids.
    pub fn prune_finished(&mut self) -> Vec<GameId> {
        let finished: Vec<GameId> = self
            .games
            .iter()
            .filter(|(_, handle)| handle.is_closed() || handle.play_state() == PlayState::Over)
            .map(|(game_id, _)| game_id.clone())
            .collect();
        for game_id in &finished {
            self.games.remove(game_id);
            self.pending_players.remove(game_id);
        }
        if !finished.is_empty() {
            tracing::debug!(count = finished.len(), "pruned finished games");
        }
        finished
    }

    pub fn contains(&self, game_id: &GameId) -> bool {
        self.games.contains_key(game_id)
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn game_ids(&self) -> Vec<GameId> {
        self.games.keys().cloned().collect()
    }
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}
