//! Per-connection gateway: decode, validate, forward to the hub.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`], plus a writer task that drains the connection's
//! outbound channel and pings the peer on an interval. The flow is:
//!   1. Register the outbound channel with the hub
//!   2. Loop: receive frame → decode + validate → dispatch to the hub
//!   3. On close, error or idle timeout: leave every room, close the socket
//!
//! Any inbound frame counts as liveness, pongs included. A client that only
//! listens stays connected as long as it answers the writer's pings.
//!
//! Frames that fail to decode or validate are answered with an `error`
//! event and go no further. They never change room state.

use std::sync::Arc;

use pomosync_protocol::{ClientEnvelope, Codec, ParticipantId, ServerEnvelope, ServerEvent};
use pomosync_room::{HubHandle, OutboundSender};
use pomosync_transport::{Connection, Frame, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::PomosyncError;
use crate::server::ServerState;

/// Drop guard that takes a participant out of every room when the handler
/// exits, including by panic. `Drop` is synchronous, so the hub call is
/// spawned.
struct DisconnectGuard {
    participant: ParticipantId,
    hub: HubHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let participant = self.participant;
        let hub = self.hub.clone();
        tokio::spawn(async move {
            if let Err(e) = hub.disconnect(participant).await {
                tracing::debug!(%participant, error = %e, "disconnect not delivered");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), PomosyncError> {
    let conn_id = conn.id();
    let participant = ParticipantId(conn_id.into_inner());
    let conn = Arc::new(conn);
    tracing::info!(%conn_id, %participant, "connection opened");

    let (tx, rx) = mpsc::unbounded_channel();
    state.hub.connect(participant, tx.clone()).await?;
    let guard = DisconnectGuard {
        participant,
        hub: state.hub.clone(),
    };

    let writer = tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), rx));

    let result = read_loop(&conn, &state, participant, &tx).await;

    // The hub drops its sender once the disconnect is processed; together
    // with ours that ends the writer after it flushes.
    drop(guard);
    drop(tx);
    let _ = writer.await;
    let _ = conn.close().await;
    tracing::info!(%conn_id, %participant, "connection closed");

    result
}

async fn read_loop<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    participant: ParticipantId,
    tx: &OutboundSender,
) -> Result<(), PomosyncError> {
    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(Frame::Data(data)))) => data,
            Ok(Ok(Some(Frame::Keepalive))) => continue,
            Ok(Ok(None)) => {
                tracing::debug!(%participant, "peer closed connection");
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!(%participant, error = %e, "recv error");
                return Err(e.into());
            }
            Err(_) => {
                tracing::info!(%participant, timeout = ?state.idle_timeout, "peer unresponsive, closing");
                return Ok(());
            }
        };

        let envelope = match decode_frame(&state.codec, &data) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(%participant, error = %e, "rejected frame");
                let _ = tx.send(ServerEvent::Error {
                    code: 400,
                    message: e.to_string(),
                });
                continue;
            }
        };

        state
            .hub
            .dispatch(participant, envelope.seq, envelope.payload)
            .await?;
    }
}

/// Turns raw bytes into a command that is safe to hand to the room core.
fn decode_frame(
    codec: &impl Codec,
    data: &[u8],
) -> Result<ClientEnvelope, pomosync_protocol::ProtocolError> {
    let envelope: ClientEnvelope = codec.decode(data)?;
    envelope.payload.validate()?;
    Ok(envelope)
}

/// Stamps and sends everything queued for this connection, in order, and
/// pings the peer every `ping_interval`.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    let mut seq: u64 = 1;
    let mut keepalive =
        tokio::time::interval_at(Instant::now() + state.ping_interval, state.ping_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            payload = rx.recv() => {
                let Some(payload) = payload else { break };
                let envelope = ServerEnvelope {
                    seq: next_seq(&mut seq),
                    timestamp: state.clock.now_ms(),
                    payload,
                };
                let bytes = match state.codec.encode(&envelope) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::error!(conn_id = %conn.id(), error = %e, "failed to encode event");
                        continue;
                    }
                };
                if let Err(e) = conn.send(&bytes).await {
                    tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
                    break;
                }
            }
            _ = keepalive.tick() => {
                if let Err(e) = conn.ping().await {
                    tracing::debug!(conn_id = %conn.id(), error = %e, "ping failed, stopping writer");
                    break;
                }
            }
        }
    }
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
