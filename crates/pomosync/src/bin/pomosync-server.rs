//! Pomosync WebSocket server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin pomosync-server
//! cargo run --bin pomosync-server -- --bind 0.0.0.0:5000 --idle-timeout-secs 120
//! POMOSYNC_BIND=0.0.0.0:5000 cargo run --bin pomosync-server
//! ```

use std::time::Duration;

use clap::Parser;
use pomosync::room::TimerConfig;
use pomosync::{PomosyncServer, ServerConfig, init_logging};
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "pomosync-server")]
#[command(about = "Shared Pomodoro timer rooms over WebSocket", long_about = None)]
struct Args {
    /// Address to bind the WebSocket listener to
    #[arg(short, long, env = "POMOSYNC_BIND", default_value = "127.0.0.1:5000")]
    bind: String,

    /// Close connections that send nothing, not even a pong, for this many seconds
    #[arg(long, env = "POMOSYNC_IDLE_TIMEOUT_SECS", default_value_t = 60)]
    idle_timeout_secs: u64,

    /// Ping each connection this often, in seconds
    #[arg(long, env = "POMOSYNC_PING_INTERVAL_SECS", default_value_t = 20)]
    ping_interval_secs: u64,

    /// Capacity of the room hub's command queue
    #[arg(long, env = "POMOSYNC_HUB_CHANNEL_SIZE", default_value_t = 1024)]
    hub_channel_size: usize,

    /// Default log level when RUST_LOG is unset
    #[arg(long, env = "POMOSYNC_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Pomodoro mode duration in seconds
    #[arg(long, env = "POMOSYNC_POMODORO_SECS", default_value_t = 1500)]
    pomodoro_secs: u32,

    /// Short break duration in seconds
    #[arg(long, env = "POMOSYNC_SHORT_BREAK_SECS", default_value_t = 300)]
    short_break_secs: u32,

    /// Long break duration in seconds
    #[arg(long, env = "POMOSYNC_LONG_BREAK_SECS", default_value_t = 900)]
    long_break_secs: u32,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            ping_interval: Duration::from_secs(self.ping_interval_secs),
            hub_channel_size: self.hub_channel_size,
            log_level: self.log_level,
            timer: TimerConfig {
                pomodoro_secs: self.pomodoro_secs,
                short_break_secs: self.short_break_secs,
                long_break_secs: self.long_break_secs,
                default_duration_secs: self.pomodoro_secs,
            },
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Args::parse().into_config();
    init_logging(env!("CARGO_BIN_NAME"), &config.log_level);

    let server = match PomosyncServer::builder().config(config).build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run_until(shutdown_signal()).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
