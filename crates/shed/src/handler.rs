//! Per-connection handler: read the join request, find or create the
//! game, and hand the connection to a player session.
//!
//! The flow is:
//!   1. Parse `gameID`, `playerID` and `name` from the upgrade query
//!   2. Find the game's lobby, creating it if the id is new
//!   3. Check the coordinator has a seat for this player
//!   4. List the player as pending in the registry
//!   5. Spawn a `NetworkPlayer` and seat it with the coordinator
//!
//! Any refusal is reported to the client as an `Error` frame before the
//! connection is closed.

use std::sync::Arc;

use percent_encoding::percent_decode_str;
use shed_coordinator::{CoordinatorHandle, GameRegistry, RegistryError};
use shed_game::Shed;
use shed_protocol::{Codec, GameId, JsonCodec, OutboundMessage, PlayerId, PlayerInfo};
use shed_session::{NetworkPlayer, Player};
use shed_transport::{Connection, WebSocketConnection};

use crate::ShedError;
use crate::server::ServerState;

/// Who is joining which game, from the upgrade request's query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JoinRequest {
    pub(crate) game_id: GameId,
    pub(crate) player: PlayerInfo,
}

impl JoinRequest {
    /// Parses `gameID=..&playerID=..&name=..`. The name defaults to the
    /// player id.
    pub(crate) fn parse(query: Option<&str>) -> Result<Self, ShedError> {
        let mut game_id = None;
        let mut player_id = None;
        let mut name = None;

        for pair in query.unwrap_or("").split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value);
            match key {
                "gameID" => game_id = Some(value),
                "playerID" => player_id = Some(value),
                "name" => name = Some(value),
                _ => {}
            }
        }

        let game_id = game_id
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ShedError::BadRequest("missing gameID".into()))?;
        let player_id = player_id
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ShedError::BadRequest("missing playerID".into()))?;
        let name = name
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| player_id.clone());

        Ok(Self {
            game_id: GameId::from(game_id),
            player: PlayerInfo::new(player_id, name),
        })
    }
}

/// Decodes a form-encoded query value: `+` is a space and `%XX` a byte.
/// Malformed escapes are kept as written.
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Handles a single connection from accept until the player is seated.
/// From then on the player's session tasks own the connection.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), ShedError> {
    let conn_id = conn.id();

    let request = match JoinRequest::parse(conn.query()) {
        Ok(request) => request,
        Err(e) => {
            refuse(&conn, PlayerId::default(), &e.to_string()).await;
            return Err(e);
        }
    };
    let game_id = request.game_id.clone();
    let player_id = request.player.id.clone();
    tracing::debug!(%conn_id, %game_id, %player_id, "join request");

    // Only one connection at a time may be joining as a given player.
    let key = (game_id.clone(), player_id.clone());
    let reserved = state.joining.lock().await.insert(key.clone());
    if !reserved {
        let e = ShedError::BadRequest(format!(
            "player {player_id} is already joining game {game_id}"
        ));
        refuse(&conn, player_id, &e.to_string()).await;
        return Err(e);
    }

    let result = join(conn, request, &state).await;
    state.joining.lock().await.remove(&key);

    if result.is_ok() {
        tracing::info!(%conn_id, %game_id, %player_id, "player connected");
    }
    result
}

/// Admits the player, announces them as pending, then seats them. The
/// registry lock is never held while waiting on a coordinator.
async fn join(
    conn: WebSocketConnection,
    request: JoinRequest,
    state: &ServerState,
) -> Result<(), ShedError> {
    let game_id = request.game_id.clone();
    let player_id = request.player.id.clone();

    let found = find_or_create(&mut *state.registry.lock().await, &game_id);
    let handle = match found {
        Ok(handle) => handle,
        Err(e) => {
            refuse(&conn, player_id, &e.to_string()).await;
            return Err(e);
        }
    };

    if let Err(e) = handle.check_join(&player_id).await {
        let e = ShedError::from(e);
        refuse(&conn, player_id, &e.to_string()).await;
        return Err(e);
    }

    let announced = state
        .registry
        .lock()
        .await
        .add_pending_player(&game_id, request.player.clone());
    if let Err(e) = announced {
        let e = ShedError::from(e);
        refuse(&conn, player_id, &e.to_string()).await;
        return Err(e);
    }

    let player = NetworkPlayer::spawn(
        conn,
        request.player,
        handle.uplink(),
        JsonCodec,
        state.config.session.clone(),
    );
    let seated = handle.register(player.clone()).await;
    state
        .registry
        .lock()
        .await
        .remove_pending_player(&game_id, &player_id);

    if let Err(e) = seated {
        // Only reachable if the game started or filled since the check
        // above. The writer flushes this before it closes the socket.
        let _ = player.send(OutboundMessage::error(player_id, e.to_string()));
        player.close();
        return Err(e.into());
    }
    Ok(())
}

/// Returns the lobby for `game_id`, creating the game if the id is new.
fn find_or_create(
    registry: &mut GameRegistry,
    game_id: &GameId,
) -> Result<CoordinatorHandle, ShedError> {
    registry.prune_finished();

    match registry.find_pending(game_id) {
        Some(handle) => Ok(handle),
        None if registry.contains(game_id) => {
            Err(RegistryError::GameAlreadyStarted(game_id.clone()).into())
        }
        None => {
            let handle = registry.create_game(game_id.clone(), Shed::new())?;
            tracing::info!(%game_id, "game created");
            Ok(handle)
        }
    }
}

/// Sends an `Error` frame straight down the socket and closes it.
async fn refuse(conn: &WebSocketConnection, player_id: PlayerId, reason: &str) {
    tracing::info!(conn_id = %conn.id(), %player_id, reason, "join refused");
    match JsonCodec.encode(&OutboundMessage::error(player_id, reason)) {
        Ok(frame) => {
            if let Err(e) = conn.send(&frame).await {
                tracing::debug!(error = %e, "failed to send refusal");
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to encode refusal"),
    }
    let _ = conn.close().await;
}
