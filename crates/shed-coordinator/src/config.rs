//! Coordinator configuration.

use std::time::Duration;

/// Settings for one game coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Fewest seated players a `Start` request is accepted with.
    pub min_players: usize,

    /// Seats at the table. Joins beyond this are refused.
    pub max_players: usize,

    /// Pause between the start broadcast and the first prompt, giving
    /// clients time to render the table.
    pub settle_delay: Duration,

    /// Capacity of the command, inbound and leave channels.
    pub channel_size: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 4,
            settle_delay: Duration::from_millis(400),
            channel_size: 64,
        }
    }
}
