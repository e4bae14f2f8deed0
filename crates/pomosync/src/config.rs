//! Server configuration.

use std::time::Duration;

use pomosync_room::TimerConfig;
use serde::{Deserialize, Serialize};

/// Settings for a [`PomosyncServer`](crate::PomosyncServer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// A connection that sends nothing for this long, not even a pong, is
    /// closed and treated as a disconnect.
    pub idle_timeout: Duration,

    /// How often the server pings each connection.
    pub ping_interval: Duration,

    /// Capacity of the hub's command queue.
    pub hub_channel_size: usize,

    /// Default filter directive when `RUST_LOG` is unset.
    pub log_level: String,

    pub timer: TimerConfig,
}

/// Floor for the ping period; `tokio::time::interval` rejects zero.
const MIN_PING_INTERVAL: Duration = Duration::from_millis(10);

impl ServerConfig {
    /// The ping period actually used: at most half the idle timeout, so a
    /// healthy peer gets at least two chances to answer before it is
    /// dropped.
    pub fn keepalive_interval(&self) -> Duration {
        self.ping_interval
            .min(self.idle_timeout / 2)
            .max(MIN_PING_INTERVAL)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            idle_timeout: Duration::from_secs(60),
            ping_interval: Duration::from_secs(20),
            hub_channel_size: 1024,
            log_level: "info".to_string(),
            timer: TimerConfig::default(),
        }
    }
}
