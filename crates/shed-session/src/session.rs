//! Network-backed players.
//!
//! A [`NetworkPlayer`] owns two tasks per connection:
//!
//! ```text
//!            ┌──────────── writer task ────────────┐
//! send() ──→ │ queue → encode → conn.send (timeout) │ ──→ client
//!            │ ping every 90% of the read deadline  │
//!            └──────────────────────────────────────┘
//!            ┌──────────── reader task ────────────┐
//! client ──→ │ conn.recv → size check → receive()   │ ──→ coordinator
//!            │ deadline pushed forward on pong      │
//!            └──────────────────────────────────────┘
//! ```
//!
//! Either task stopping closes the connection and stops the other; the
//! writer first sends whatever is already queued. When the reader stops
//! it tells the coordinator the player has left.

use std::sync::Arc;
use std::time::Duration;

use shed_protocol::{
    CardsSnapshot, Codec, InboundMessage, OutboundMessage, PlayerId, PlayerInfo,
};
use shed_transport::{Connection, Incoming};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::player::{LastSeenCards, Player, Uplink};
use crate::{SendError, SessionError};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timeouts and limits for network players.
///
/// Override only the fields you care about:
///
/// ```rust
/// use std::time::Duration;
/// use shed_session::SessionConfig;
///
/// let config = SessionConfig {
///     read_deadline: Duration::from_secs(20),
///     ..SessionConfig::default()
/// };
/// assert_eq!(config.ping_interval(), Duration::from_secs(18));
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long the reader waits without a keep-alive reply before giving
    /// up on the connection.
    pub read_deadline: Duration,
    /// Bound on each frame or ping write.
    pub write_deadline: Duration,
    /// Capacity of the per-player send queue.
    pub send_queue: usize,
    /// Largest inbound frame accepted, in bytes.
    pub max_frame_bytes: usize,
}

impl SessionConfig {
    /// Keep-alive pings go out at 90% of the read deadline so a healthy
    /// peer always answers in time.
    pub fn ping_interval(&self) -> Duration {
        self.read_deadline * 9 / 10
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_deadline: Duration::from_secs(60),
            write_deadline: Duration::from_secs(10),
            send_queue: 32,
            max_frame_bytes: 512,
        }
    }
}

// ---------------------------------------------------------------------------
// NetworkPlayer
// ---------------------------------------------------------------------------

/// A player connected over a [`Connection`].
pub struct NetworkPlayer<C: Codec> {
    info: PlayerInfo,
    queue: mpsc::Sender<OutboundMessage>,
    uplink: Uplink,
    codec: Arc<C>,
    cards: LastSeenCards,
    /// Flipped to `true` once the session should end.
    closed: watch::Sender<bool>,
}

impl<C: Codec> NetworkPlayer<C> {
    /// Starts the reader and writer tasks for `conn` and returns the
    /// player handle.
    pub fn spawn<T: Connection>(
        conn: T,
        info: PlayerInfo,
        uplink: Uplink,
        codec: C,
        config: SessionConfig,
    ) -> Arc<Self> {
        let (queue, outbox) = mpsc::channel(config.send_queue);
        let (closed, _) = watch::channel(false);
        let conn = Arc::new(conn);
        let codec = Arc::new(codec);

        let player = Arc::new(Self {
            info,
            queue,
            uplink,
            codec: Arc::clone(&codec),
            cards: LastSeenCards::default(),
            closed,
        });

        tracing::debug!(player_id = %player.info.id, conn_id = %conn.id(), "session started");

        tokio::spawn(write_loop(
            Arc::clone(&conn),
            outbox,
            codec,
            player.closed.subscribe(),
            config.clone(),
            player.info.id.clone(),
        ));
        tokio::spawn(read_loop(conn, Arc::clone(&player), config));

        player
    }

    /// Ends the session: the writer closes the connection and the reader
    /// stops.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl<C: Codec> Player for NetworkPlayer<C> {
    fn id(&self) -> &PlayerId {
        &self.info.id
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    fn info(&self) -> PlayerInfo {
        self.info.clone()
    }

    fn cards(&self) -> CardsSnapshot {
        self.cards.get()
    }

    fn send(&self, msg: OutboundMessage) -> Result<(), SendError> {
        self.cards.observe(&msg);
        match self.queue.try_send(msg) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(player_id = %self.info.id, "send queue full, closing connection");
                self.close();
                Err(SendError::QueueFull(self.info.id.clone()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(SendError::Closed(self.info.id.clone()))
            }
        }
    }

    fn receive(&self, frame: &[u8]) -> Result<(), SessionError> {
        let mut msg: InboundMessage = self.codec.decode(frame)?;
        // Clients only ever speak for themselves.
        msg.player_id = self.info.id.clone();
        self.uplink.deliver(msg)
    }
}

async fn write_loop<T: Connection, C: Codec>(
    conn: Arc<T>,
    mut outbox: mpsc::Receiver<OutboundMessage>,
    codec: Arc<C>,
    mut closed: watch::Receiver<bool>,
    config: SessionConfig,
    player_id: PlayerId,
) {
    let mut ping = tokio::time::interval(config.ping_interval());
    // The first tick fires immediately.
    ping.tick().await;

    loop {
        tokio::select! {
            // Queued messages go out before a close takes effect.
            biased;
            next = outbox.recv() => {
                let Some(msg) = next else { break };
                let bytes = match codec.encode(&msg) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(%player_id, error = %e, "failed to encode message");
                        continue;
                    }
                };
                match tokio::time::timeout(config.write_deadline, conn.send(&bytes)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::debug!(%player_id, error = %e, "write failed");
                        break;
                    }
                    Err(_) => {
                        tracing::info!(%player_id, "write deadline passed");
                        break;
                    }
                }
            }
            _ = ping.tick() => {
                match tokio::time::timeout(config.write_deadline, conn.ping()).await {
                    Ok(Ok(())) => {}
                    _ => {
                        tracing::debug!(%player_id, "ping failed");
                        break;
                    }
                }
            }
            _ = closed.changed() => break,
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%player_id, error = %e, "close failed");
    }
    tracing::debug!(%player_id, "writer stopped");
}

async fn read_loop<T: Connection, C: Codec>(
    conn: Arc<T>,
    player: Arc<NetworkPlayer<C>>,
    config: SessionConfig,
) {
    let player_id = player.info.id.clone();
    let mut closed = player.closed.subscribe();
    let mut deadline = Instant::now() + config.read_deadline;

    loop {
        let incoming = tokio::select! {
            result = tokio::time::timeout_at(deadline, conn.recv()) => result,
            _ = closed.changed() => break,
        };

        match incoming {
            Ok(Ok(Some(Incoming::Pong))) => {
                deadline = Instant::now() + config.read_deadline;
            }
            Ok(Ok(Some(Incoming::Frame(frame)))) => {
                if frame.len() > config.max_frame_bytes {
                    let err = SessionError::FrameTooLarge {
                        size: frame.len(),
                        max: config.max_frame_bytes,
                    };
                    tracing::warn!(%player_id, error = %err, "dropping connection");
                    break;
                }
                if let Err(e) = player.receive(&frame) {
                    if e.is_fatal() {
                        tracing::warn!(%player_id, error = %e, "dropping connection");
                        break;
                    }
                    tracing::debug!(%player_id, error = %e, "ignoring frame");
                }
            }
            Ok(Ok(None)) => {
                tracing::info!(%player_id, "connection closed by client");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%player_id, error = %e, "read failed");
                break;
            }
            Err(_) => {
                tracing::info!(%player_id, "read deadline passed");
                break;
            }
        }
    }

    player.close();
    player.uplink.leave(player_id.clone()).await;
    tracing::debug!(%player_id, "reader stopped");
}
