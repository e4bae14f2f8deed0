//! `PomosyncServer` builder and server loop.
//!
//! This is the entry point for running a Pomosync server. It ties the
//! layers together: transport → protocol → gateway → room hub.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pomosync_protocol::{Codec, JsonCodec};
use pomosync_room::{Clock, HubHandle, SyncService, SystemClock, TimerConfig, spawn_hub};
use pomosync_transport::{Transport, WebSocketTransport};
use tokio::task::JoinHandle;

use crate::handler::handle_connection;
use crate::{PomosyncError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) hub: HubHandle,
    pub(crate) codec: C,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) idle_timeout: Duration,
    pub(crate) ping_interval: Duration,
}

/// Builder for configuring and starting a Pomosync server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), pomosync::PomosyncError> {
/// use pomosync::PomosyncServer;
///
/// let server = PomosyncServer::builder()
///     .bind("0.0.0.0:5000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PomosyncServerBuilder {
    config: ServerConfig,
    clock: Arc<dyn Clock>,
}

impl PomosyncServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// How often the server pings each connection. Clamped below the idle
    /// timeout so a listening client always gets a chance to answer.
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.config.ping_interval = interval;
        self
    }

    pub fn hub_channel_size(mut self, size: usize) -> Self {
        self.config.hub_channel_size = size;
        self
    }

    pub fn timer_config(mut self, timer: TimerConfig) -> Self {
        self.config.timer = timer;
        self
    }

    /// Overrides the wall clock used for timer reconciliation and frame
    /// timestamps.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Binds the listener and starts the room hub.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<PomosyncServer<JsonCodec>, PomosyncError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let service = SyncService::with_clock(self.config.timer.clone(), Arc::clone(&self.clock));
        let (hub, hub_task) = spawn_hub(service, self.config.hub_channel_size);

        let state = Arc::new(ServerState {
            hub,
            codec: JsonCodec,
            clock: self.clock,
            idle_timeout: self.config.idle_timeout,
            ping_interval: self.config.keepalive_interval(),
        });

        Ok(PomosyncServer {
            transport,
            state,
            hub_task,
        })
    }
}

impl Default for PomosyncServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Pomosync server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct PomosyncServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    hub_task: JoinHandle<()>,
}

impl PomosyncServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> PomosyncServerBuilder {
        PomosyncServerBuilder::new()
    }
}

impl<C: Codec> PomosyncServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the room hub, for queries from outside a connection.
    pub fn hub(&self) -> HubHandle {
        self.state.hub.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), PomosyncError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops the hub.
    ///
    /// Open connections are not awaited; once the hub is gone their next
    /// command fails and they close.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), PomosyncError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Pomosync server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("shutdown requested, no longer accepting connections");
        self.state.hub.shutdown().await?;
        let _ = self.hub_task.await;
        tracing::info!("Pomosync server stopped");
        Ok(())
    }
}
