//! `ShedServer` builder and accept loop.
//!
//! This is the entry point for running a Shed server. It ties together all
//! the layers: transport → session → coordinator → engine.

use std::collections::HashSet;
use std::sync::Arc;

use shed_coordinator::{CoordinatorConfig, GameRegistry};
use shed_protocol::{GameId, PlayerId};
use shed_session::SessionConfig;
use shed_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{ServerConfig, ShedError};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) registry: Mutex<GameRegistry>,
    /// Players whose connection is between accept and seating.
    pub(crate) joining: Mutex<HashSet<(GameId, PlayerId)>>,
    pub(crate) config: ServerConfig,
}

impl ServerState {
    pub(crate) fn new(config: ServerConfig) -> Self {
        Self {
            registry: Mutex::new(GameRegistry::new(config.coordinator.clone())),
            joining: Mutex::new(HashSet::new()),
            config,
        }
    }
}

/// Builder for configuring and starting a Shed server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), shed::ShedError> {
/// use shed::ShedServer;
///
/// let server = ShedServer::builder()
///     .bind("127.0.0.1:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ShedServerBuilder {
    config: ServerConfig,
}

impl ShedServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.listen_addr = addr.to_string();
        self
    }

    /// Sets the request path clients connect on.
    pub fn join_path(mut self, path: &str) -> Self {
        self.config.join_path = path.to_string();
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    pub fn coordinator_config(mut self, config: CoordinatorConfig) -> Self {
        self.config.coordinator = config;
        self
    }

    /// Binds the listener. The server accepts nothing until
    /// [`run`](ShedServer::run) is called.
    pub async fn build(self) -> Result<ShedServer, ShedError> {
        let transport = WebSocketTransport::bind(&self.config.listen_addr)
            .await?
            .with_path(self.config.join_path.clone());

        let state = Arc::new(ServerState::new(self.config));

        Ok(ShedServer { transport, state })
    }
}

impl Default for ShedServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Shed server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct ShedServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl ShedServer {
    pub fn builder() -> ShedServerBuilder {
        ShedServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), ShedError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `signal` completes, then stops every
    /// game.
    ///
    /// Each accepted connection gets its own task, which reads the join
    /// request and seats the player.
    pub async fn run_until<F>(mut self, signal: F) -> Result<(), ShedError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(signal);
        tracing::info!(
            path = %self.state.config.join_path,
            "Shed server running"
        );

        loop {
            tokio::select! {
                _ = &mut signal => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "join failed");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }

        self.transport.shutdown().await?;
        let mut registry = self.state.registry.lock().await;
        for game_id in registry.game_ids() {
            registry.remove_game(&game_id).await;
        }
        tracing::info!("Shed server stopped");
        Ok(())
    }
}
