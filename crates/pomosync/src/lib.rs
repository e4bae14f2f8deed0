//! # Pomosync
//!
//! Shared Pomodoro timers over WebSocket.
//!
//! Clients create or join named rooms. Everyone in a room sees the same
//! countdown and can start, pause, reset, switch mode or nudge it. The
//! server holds the authoritative state and pushes a fresh snapshot to the
//! room after every change; clients tick locally in between.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), pomosync::PomosyncError> {
//! use pomosync::PomosyncServer;
//!
//! let server = PomosyncServer::builder()
//!     .bind("127.0.0.1:5000")
//!     .build()
//!     .await?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod logging;
mod server;

pub use config::ServerConfig;
pub use error::PomosyncError;
pub use logging::init_logging;
pub use server::{PomosyncServer, PomosyncServerBuilder};

pub use pomosync_protocol as protocol;
pub use pomosync_room as room;
