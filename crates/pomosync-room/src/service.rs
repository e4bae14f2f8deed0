//! The synchronous core: every client command, applied to the registry and
//! fanned out through the broadcaster.

use std::sync::Arc;

use pomosync_protocol::{
    Ack, Command, CreateRoomRequest, HeartbeatAck, JoinRoomRequest, ParticipantId, RoomId,
    ServerEvent, TimerSnapshot,
};

use crate::machine::{self, Control, Transition};
use crate::presence::{self, Departure};
use crate::{
    Clock, OutboundSender, RoomError, RoomRegistry, RoomState, SyncBroadcaster, SystemClock,
    TimerConfig,
};

/// Owns all room state. Not thread-safe on purpose: the [`Hub`](crate::spawn_hub)
/// wraps it in a single task so that each command runs to completion,
/// broadcasts included, before the next one starts.
///
/// Every command resolves to exactly one of two outcomes: the state changes
/// and the affected participants are told, or nothing changes and nothing
/// is sent.
pub struct SyncService {
    registry: RoomRegistry,
    broadcaster: SyncBroadcaster,
    clock: Arc<dyn Clock>,
    config: TimerConfig,
}

impl SyncService {
    /// A service on the system clock.
    pub fn new(config: TimerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    pub fn with_clock(config: TimerConfig, clock: impl Clock) -> Self {
        Self {
            registry: RoomRegistry::new(),
            broadcaster: SyncBroadcaster::new(),
            clock: Arc::new(clock),
            config,
        }
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn room_count(&self) -> usize {
        self.registry.len()
    }

    /// Full state of one room at the current instant, if it exists.
    pub fn snapshot(&self, room_id: &RoomId) -> Option<TimerSnapshot> {
        let now = self.now_ms();
        self.registry.get(room_id).ok().map(|room| room.snapshot(now))
    }

    /// Registers the outbound channel for a new connection.
    pub fn connect(&mut self, participant: ParticipantId, sender: OutboundSender) {
        self.broadcaster.register(participant, sender);
        tracing::debug!(
            %participant,
            connections = self.broadcaster.connection_count(),
            "participant connected"
        );
    }

    /// Applies one decoded, validated command from `participant`.
    ///
    /// `seq` is the client's correlation id, echoed in acknowledgments.
    pub fn handle(&mut self, participant: ParticipantId, seq: u64, command: Command) {
        tracing::trace!(%participant, seq, command = command.name(), "handling command");
        match command {
            Command::CreateRoom(req) => {
                let ack = to_ack(seq, self.create_room(participant, req));
                self.broadcaster.send_to(participant, ServerEvent::Ack(ack));
            }
            Command::JoinRoom(req) => {
                let ack = to_ack(seq, self.join_room(participant, req));
                self.broadcaster.send_to(participant, ServerEvent::Ack(ack));
            }
            Command::LeaveRoom(room_id) => {
                let _ = self.leave_room(participant, &room_id);
            }
            Command::RequestSync(room_id) => {
                let _ = self.request_sync(participant, &room_id);
            }
            Command::StartTimer(room_id) => {
                let _ = self.control(&room_id, Control::Start);
            }
            Command::PauseTimer(room_id) => {
                let _ = self.control(&room_id, Control::Pause);
            }
            Command::ResetTimer(room_id) => {
                let _ = self.control(&room_id, Control::Reset);
            }
            Command::ModeChange(req) => {
                let _ = self.control(&req.room_id, Control::ChangeMode(req.mode));
            }
            Command::AdjustTime(req) => {
                let _ = self.control(&req.room_id, Control::AdjustTime(req.delta_seconds));
            }
            Command::Heartbeat(req) => {
                let ack = HeartbeatAck {
                    client_time: req.client_time,
                    server_time: self.now_ms(),
                };
                self.broadcaster.send_to(participant, ServerEvent::HeartbeatAck(ack));
            }
        }
    }

    /// Creates a room with `participant` as its only member.
    pub fn create_room(
        &mut self,
        participant: ParticipantId,
        req: CreateRoomRequest,
    ) -> Result<TimerSnapshot, RoomError> {
        let duration = self.config.initial_duration(req.duration);
        let room = RoomState::new(req.room_id, participant, req.username, duration);
        let now = self.now_ms();
        let room = self.registry.create(room).inspect_err(|err| {
            tracing::debug!(%participant, %err, "create_room rejected");
        })?;
        tracing::info!(room_id = %room.room_id(), %participant, duration, "room created");
        Ok(room.snapshot(now))
    }

    /// Adds `participant` to an existing room and tells the other members.
    /// The joiner learns the state from the returned snapshot instead.
    pub fn join_room(
        &mut self,
        participant: ParticipantId,
        req: JoinRoomRequest,
    ) -> Result<TimerSnapshot, RoomError> {
        let now = self.now_ms();
        let room = self.registry.get_mut(&req.room_id).inspect_err(|err| {
            tracing::debug!(%participant, %err, "join_room rejected");
        })?;
        let is_new = presence::join(room, participant, req.username);
        let snapshot = room.snapshot(now);
        tracing::info!(
            room_id = %req.room_id,
            %participant,
            participants = snapshot.participants.len(),
            rejoin = !is_new,
            "participant joined"
        );
        self.broadcaster
            .broadcast_presence(&self.registry, &req.room_id, Some(participant));
        Ok(snapshot)
    }

    /// Removes `participant` from a room, deleting the room if that
    /// emptied it and otherwise telling the remaining members.
    pub fn leave_room(&mut self, participant: ParticipantId, room_id: &RoomId) -> Departure {
        let Ok(room) = self.registry.get_mut(room_id) else {
            tracing::debug!(%room_id, %participant, "leave_room on missing room");
            return Departure::NotMember;
        };
        let departure = presence::leave(room, participant);
        match departure {
            Departure::NotMember => {
                tracing::debug!(%room_id, %participant, "leave_room by non-member");
            }
            Departure::Left => {
                tracing::info!(%room_id, %participant, "participant left");
                self.broadcaster.broadcast_presence(&self.registry, room_id, None);
            }
            Departure::Emptied => {
                self.registry.remove(room_id);
                tracing::info!(%room_id, %participant, rooms = self.registry.len(), "room deleted");
            }
        }
        departure
    }

    /// Unicasts the room's current state to `participant`.
    pub fn request_sync(&self, participant: ParticipantId, room_id: &RoomId) -> bool {
        let sent = self
            .broadcaster
            .send_snapshot_to(&self.registry, participant, room_id, self.now_ms());
        if !sent {
            tracing::debug!(%room_id, %participant, "request_sync not delivered");
        }
        sent
    }

    /// Applies a timer command and broadcasts the result if it changed
    /// anything.
    pub fn control(&mut self, room_id: &RoomId, control: Control) -> Result<Transition, RoomError> {
        let now = self.now_ms();
        let room = self.registry.get_mut(room_id).inspect_err(|_| {
            tracing::debug!(%room_id, ?control, "timer command on missing room");
        })?;
        let transition = machine::apply(room, control, now, &self.config);
        if transition.is_applied() {
            let sent = self.broadcaster.broadcast_timer(&self.registry, room_id, now);
            tracing::debug!(%room_id, ?control, recipients = sent, "timer updated");
        } else {
            tracing::debug!(%room_id, ?control, "timer command ignored");
        }
        Ok(transition)
    }

    /// Tears down a connection: leaves every room it is in, then drops its
    /// outbound channel. Afterwards no room lists `participant`.
    pub fn disconnect(&mut self, participant: ParticipantId) {
        let rooms = self.registry.rooms_with(participant);
        for room_id in &rooms {
            let _ = self.leave_room(participant, room_id);
        }
        self.broadcaster.unregister(participant);
        tracing::debug!(%participant, rooms_left = rooms.len(), "participant disconnected");
    }
}

fn to_ack(seq: u64, result: Result<TimerSnapshot, RoomError>) -> Ack {
    match result {
        Ok(snapshot) => Ack::success(seq, snapshot),
        Err(err) => Ack::failure(seq, err.client_message()),
    }
}
