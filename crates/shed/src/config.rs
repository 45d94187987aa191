//! Server configuration.

use shed_coordinator::CoordinatorConfig;
use shed_session::SessionConfig;

/// Environment variable that overrides [`ServerConfig::listen_addr`].
pub const LISTEN_ADDR_ENV: &str = "SHED_LISTEN_ADDR";

/// Everything the server needs to know before it binds.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub listen_addr: String,
    /// The only request path upgraded to a game connection.
    pub join_path: String,
    /// Timeouts and limits for each player connection.
    pub session: SessionConfig,
    /// Settings for each game's coordinator.
    pub coordinator: CoordinatorConfig,
}

impl ServerConfig {
    /// Defaults, with `listen_addr` taken from `SHED_LISTEN_ADDR` when set.
    pub fn from_env() -> Self {
        Self::default().with_listen_addr_from(std::env::var(LISTEN_ADDR_ENV).ok())
    }

    fn with_listen_addr_from(mut self, value: Option<String>) -> Self {
        if let Some(addr) = value.filter(|v| !v.trim().is_empty()) {
            self.listen_addr = addr.trim().to_string();
        }
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            join_path: "/join".to_string(),
            session: SessionConfig::default(),
            coordinator: CoordinatorConfig::default(),
        }
    }
}
