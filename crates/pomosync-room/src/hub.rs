//! Hub actor: a single Tokio task that owns every room.
//!
//! Connection handlers never touch room state directly. They send commands
//! through a [`HubHandle`], and the hub applies them one at a time, so a
//! command and all the broadcasts it causes finish before the next command
//! is looked at.

use pomosync_protocol::{Command, ParticipantId, RoomId, TimerSnapshot};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{OutboundSender, RoomError, SyncService};

/// Commands sent to the hub through its channel.
pub(crate) enum HubCommand {
    /// A new connection and its outbound channel.
    Connect {
        participant: ParticipantId,
        sender: OutboundSender,
    },

    /// A decoded, validated client command.
    Dispatch {
        participant: ParticipantId,
        seq: u64,
        command: Command,
    },

    /// The connection is gone; leave every room it was in.
    Disconnect { participant: ParticipantId },

    /// Query one room's current state.
    Snapshot {
        room_id: RoomId,
        reply: oneshot::Sender<Option<TimerSnapshot>>,
    },

    /// Query the number of live rooms.
    RoomCount { reply: oneshot::Sender<usize> },

    /// Stop the hub.
    Shutdown,
}

/// Handle to the running hub. Cheap to clone; one per connection.
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Registers a connection's outbound channel. Must precede any
    /// [`dispatch`](Self::dispatch) from the same participant.
    pub async fn connect(
        &self,
        participant: ParticipantId,
        sender: OutboundSender,
    ) -> Result<(), RoomError> {
        self.send(HubCommand::Connect {
            participant,
            sender,
        })
        .await
    }

    /// Forwards a client command (fire-and-forget). Results arrive on the
    /// participant's outbound channel.
    pub async fn dispatch(
        &self,
        participant: ParticipantId,
        seq: u64,
        command: Command,
    ) -> Result<(), RoomError> {
        self.send(HubCommand::Dispatch {
            participant,
            seq,
            command,
        })
        .await
    }

    pub async fn disconnect(&self, participant: ParticipantId) -> Result<(), RoomError> {
        self.send(HubCommand::Disconnect { participant }).await
    }

    /// Current state of `room_id`, or `None` if no such room is live.
    pub async fn snapshot(&self, room_id: RoomId) -> Result<Option<TimerSnapshot>, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::Snapshot {
            room_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    pub async fn room_count(&self) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::RoomCount { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Tells the hub to stop. Commands already queued ahead of this one are
    /// still applied.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(HubCommand::Shutdown).await
    }

    async fn send(&self, command: HubCommand) -> Result<(), RoomError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| RoomError::Unavailable)
    }
}

/// Spawns the hub task around `service`.
///
/// `channel_size` bounds the command queue; a full queue applies
/// backpressure to connection handlers. The task ends on
/// [`HubHandle::shutdown`] or when every handle has been dropped.
pub fn spawn_hub(service: SyncService, channel_size: usize) -> (HubHandle, JoinHandle<()>) {
    let (sender, receiver) = mpsc::channel(channel_size.max(1));
    let hub = Hub { service, receiver };
    let task = tokio::spawn(hub.run());
    (HubHandle { sender }, task)
}

struct Hub {
    service: SyncService,
    receiver: mpsc::Receiver<HubCommand>,
}

impl Hub {
    async fn run(mut self) {
        tracing::info!("room hub started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                HubCommand::Connect {
                    participant,
                    sender,
                } => self.service.connect(participant, sender),
                HubCommand::Dispatch {
                    participant,
                    seq,
                    command,
                } => self.service.handle(participant, seq, command),
                HubCommand::Disconnect { participant } => self.service.disconnect(participant),
                HubCommand::Snapshot { room_id, reply } => {
                    let _ = reply.send(self.service.snapshot(&room_id));
                }
                HubCommand::RoomCount { reply } => {
                    let _ = reply.send(self.service.room_count());
                }
                HubCommand::Shutdown => {
                    tracing::info!(rooms = self.service.room_count(), "room hub shutting down");
                    break;
                }
            }
        }

        tracing::info!("room hub stopped");
    }
}

#[cfg(test)]
mod tests {
    use pomosync_protocol::{CreateRoomRequest, ServerEvent};

    use super::*;
    use crate::{ManualClock, TimerConfig};

    #[tokio::test]
    async fn test_dispatch_then_query_sees_result() {
        let service = SyncService::with_clock(TimerConfig::default(), ManualClock::new(0));
        let (hub, _task) = spawn_hub(service, 8);
        let (tx, mut rx) = mpsc::unbounded_channel();

        hub.connect(ParticipantId(1), tx).await.unwrap();
        hub.dispatch(
            ParticipantId(1),
            1,
            Command::CreateRoom(CreateRoomRequest {
                room_id: RoomId::from("R1"),
                username: "Alice".into(),
                duration: None,
            }),
        )
        .await
        .unwrap();

        assert!(matches!(rx.recv().await, Some(ServerEvent::Ack(ack)) if ack.ok));
        assert_eq!(hub.room_count().await.unwrap(), 1);
        assert!(hub.snapshot(RoomId::from("R1")).await.unwrap().is_some());
        assert!(hub.snapshot(RoomId::from("R2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_handle_errors_after_shutdown() {
        let service = SyncService::with_clock(TimerConfig::default(), ManualClock::new(0));
        let (hub, task) = spawn_hub(service, 8);

        hub.shutdown().await.unwrap();
        task.await.unwrap();

        assert_eq!(hub.room_count().await, Err(RoomError::Unavailable));
        assert_eq!(hub.disconnect(ParticipantId(1)).await, Err(RoomError::Unavailable));
    }
}
