//! Fan-out of room state to connected participants.

use std::collections::HashMap;

use pomosync_protocol::{ParticipantId, RoomId, ServerEvent};
use tokio::sync::mpsc;

use crate::RoomRegistry;

/// Channel sender for delivering events to one connection's writer task.
pub type OutboundSender = mpsc::UnboundedSender<ServerEvent>;

/// Routes events to connections by participant id.
///
/// A room's subscribers are exactly its participants, so there is no
/// separate topic table to keep consistent with membership. Delivery is
/// best-effort: an event for a connection whose writer has gone away is
/// dropped.
#[derive(Debug, Default)]
pub struct SyncBroadcaster {
    connections: HashMap<ParticipantId, OutboundSender>,
}

impl SyncBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, participant: ParticipantId, sender: OutboundSender) {
        self.connections.insert(participant, sender);
    }

    pub fn unregister(&mut self, participant: ParticipantId) {
        self.connections.remove(&participant);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Unicasts `event`. Returns `false` if it could not be handed off.
    pub fn send_to(&self, participant: ParticipantId, event: ServerEvent) -> bool {
        match self.connections.get(&participant) {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Pushes the room's full timer state, reconciled to `now_ms`, to every
    /// participant. No-op if the room is gone. Returns the number of
    /// connections the event was handed to.
    pub fn broadcast_timer(&self, registry: &RoomRegistry, room_id: &RoomId, now_ms: u64) -> usize {
        let Ok(room) = registry.get(room_id) else {
            return 0;
        };
        let event = ServerEvent::TimerUpdate(room.snapshot(now_ms));
        self.fan_out(room.participants(), &event, None)
    }

    /// Pushes the room's participant lists to every participant except
    /// `except`. No-op if the room is gone.
    pub fn broadcast_presence(
        &self,
        registry: &RoomRegistry,
        room_id: &RoomId,
        except: Option<ParticipantId>,
    ) -> usize {
        let Ok(room) = registry.get(room_id) else {
            return 0;
        };
        let event = ServerEvent::PresenceUpdate(room.presence());
        self.fan_out(room.participants(), &event, except)
    }

    /// Unicasts the room's full timer state to one requester.
    pub fn send_snapshot_to(
        &self,
        registry: &RoomRegistry,
        participant: ParticipantId,
        room_id: &RoomId,
        now_ms: u64,
    ) -> bool {
        let Ok(room) = registry.get(room_id) else {
            return false;
        };
        self.send_to(participant, ServerEvent::TimerUpdate(room.snapshot(now_ms)))
    }

    fn fan_out(
        &self,
        participants: impl Iterator<Item = ParticipantId>,
        event: &ServerEvent,
        except: Option<ParticipantId>,
    ) -> usize {
        participants
            .filter(|p| Some(*p) != except)
            .filter(|p| self.send_to(*p, event.clone()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::{RoomState, presence};

    fn connect(
        broadcaster: &mut SyncBroadcaster,
        id: u64,
    ) -> UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        broadcaster.register(ParticipantId(id), tx);
        rx
    }

    fn registry_with_two() -> RoomRegistry {
        let mut registry = RoomRegistry::new();
        let room = registry
            .create(RoomState::new(RoomId::from("R1"), ParticipantId(1), "Alice".into(), 1500))
            .unwrap();
        let _ = presence::join(room, ParticipantId(2), "Bob".into());
        registry
    }

    #[test]
    fn test_broadcast_timer_reaches_every_participant() {
        let mut broadcaster = SyncBroadcaster::new();
        let mut alice = connect(&mut broadcaster, 1);
        let mut bob = connect(&mut broadcaster, 2);
        let mut outsider = connect(&mut broadcaster, 3);
        let registry = registry_with_two();

        let sent = broadcaster.broadcast_timer(&registry, &RoomId::from("R1"), 0);
        assert_eq!(sent, 2);

        for rx in [&mut alice, &mut bob] {
            match rx.try_recv().unwrap() {
                ServerEvent::TimerUpdate(snap) => assert_eq!(snap.remaining_seconds, 1500),
                other => panic!("expected timer_update, got {other:?}"),
            }
        }
        assert!(outsider.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_presence_skips_excluded() {
        let mut broadcaster = SyncBroadcaster::new();
        let mut alice = connect(&mut broadcaster, 1);
        let mut bob = connect(&mut broadcaster, 2);
        let registry = registry_with_two();

        let sent = broadcaster.broadcast_presence(
            &registry,
            &RoomId::from("R1"),
            Some(ParticipantId(2)),
        );
        assert_eq!(sent, 1);
        assert!(matches!(alice.try_recv().unwrap(), ServerEvent::PresenceUpdate(_)));
        assert!(bob.try_recv().is_err());
    }

    #[test]
    fn test_missing_room_sends_nothing() {
        let mut broadcaster = SyncBroadcaster::new();
        let mut alice = connect(&mut broadcaster, 1);
        let registry = RoomRegistry::new();

        assert_eq!(broadcaster.broadcast_timer(&registry, &RoomId::from("R1"), 0), 0);
        assert_eq!(broadcaster.broadcast_presence(&registry, &RoomId::from("R1"), None), 0);
        assert!(!broadcaster.send_snapshot_to(&registry, ParticipantId(1), &RoomId::from("R1"), 0));
        assert!(alice.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver_is_skipped() {
        let mut broadcaster = SyncBroadcaster::new();
        let alice = connect(&mut broadcaster, 1);
        let mut bob = connect(&mut broadcaster, 2);
        drop(alice);
        let registry = registry_with_two();

        assert_eq!(broadcaster.broadcast_timer(&registry, &RoomId::from("R1"), 0), 1);
        assert!(bob.try_recv().is_ok());
    }

    #[test]
    fn test_snapshot_is_unicast() {
        let mut broadcaster = SyncBroadcaster::new();
        let mut alice = connect(&mut broadcaster, 1);
        let mut bob = connect(&mut broadcaster, 2);
        let registry = registry_with_two();

        assert!(broadcaster.send_snapshot_to(&registry, ParticipantId(2), &RoomId::from("R1"), 0));
        assert!(alice.try_recv().is_err());
        assert!(matches!(bob.try_recv().unwrap(), ServerEvent::TimerUpdate(_)));
    }
}
