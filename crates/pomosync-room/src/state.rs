//! The authoritative per-room record.

use std::collections::BTreeMap;

use pomosync_protocol::{ParticipantId, PresenceSnapshot, RoomId, TimerMode, TimerSnapshot};

use crate::timer::effective_remaining;

/// One live room: a shared timer plus the connections joined to it.
///
/// Two invariants hold by construction:
///
/// - the timer is running exactly when `started_at_ms` is `Some`, so there
///   is no separate running flag to drift out of sync;
/// - participants and their display names live in one map, so the two
///   always have the same keys.
///
/// `remaining_seconds` is the countdown as of the last state-changing
/// command. While running, what clients see is derived from it by
/// [`effective_remaining`] and it is not written back until the next
/// pause, reset, mode change or adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomState {
    pub(crate) room_id: RoomId,
    pub(crate) mode: TimerMode,
    pub(crate) remaining_seconds: u32,
    pub(crate) started_at_ms: Option<u64>,
    pub(crate) base_duration_seconds: u32,
    pub(crate) participants: BTreeMap<ParticipantId, String>,
}

impl RoomState {
    /// A stopped pomodoro room containing only its creator.
    pub fn new(
        room_id: RoomId,
        creator: ParticipantId,
        creator_name: String,
        duration_secs: u32,
    ) -> Self {
        Self {
            room_id,
            mode: TimerMode::Pomodoro,
            remaining_seconds: duration_secs,
            started_at_ms: None,
            base_duration_seconds: duration_secs,
            participants: BTreeMap::from([(creator, creator_name)]),
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Stored countdown; see the type docs for when it is current.
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.started_at_ms.is_some()
    }

    pub fn started_at_ms(&self) -> Option<u64> {
        self.started_at_ms
    }

    pub fn base_duration_seconds(&self) -> u32 {
        self.base_duration_seconds
    }

    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.participants.contains_key(&participant)
    }

    pub fn username(&self, participant: ParticipantId) -> Option<&str> {
        self.participants.get(&participant).map(String::as_str)
    }

    /// Participant ids in ascending order.
    pub fn participants(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.participants.keys().copied()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Full state as a client should see it at `now_ms`.
    pub fn snapshot(&self, now_ms: u64) -> TimerSnapshot {
        let (participants, participant_usernames) = self.presence_lists();
        TimerSnapshot {
            room_id: self.room_id.clone(),
            mode: self.mode,
            is_running: self.is_running(),
            remaining_seconds: effective_remaining(self, now_ms),
            base_duration_seconds: self.base_duration_seconds,
            start_at_epoch_ms: self.started_at_ms,
            participants,
            participant_usernames,
        }
    }

    pub fn presence(&self) -> PresenceSnapshot {
        let (participants, participant_usernames) = self.presence_lists();
        PresenceSnapshot {
            room_id: self.room_id.clone(),
            participants,
            participant_usernames,
        }
    }

    fn presence_lists(&self) -> (Vec<ParticipantId>, Vec<String>) {
        self.participants
            .iter()
            .map(|(id, name)| (*id, name.clone()))
            .unzip()
    }
}
