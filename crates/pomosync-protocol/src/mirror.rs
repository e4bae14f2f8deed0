//! Client-side mirror of a room's timer.
//!
//! The server never ticks. A client that wants a smooth countdown keeps a
//! [`TimerMirror`], feeds it every [`ServerEnvelope`] it receives, and asks
//! it for the remaining time whenever it repaints. The mirror is advisory:
//! every `timer_update` replaces it wholesale, so local drift never
//! survives past the next server snapshot.

use crate::{Ack, HeartbeatAck, RoomId, ServerEnvelope, ServerEvent, TimerMode, TimerSnapshot};

/// Last-snapshot-wins cache of one room's timer, with local ticking.
#[derive(Debug, Clone)]
pub struct TimerMirror {
    room_id: RoomId,
    snapshot: Option<TimerSnapshot>,
    /// Local clock (epoch ms) when `snapshot` arrived.
    received_at_ms: u64,
    /// Server timestamp of the envelope that carried `snapshot`.
    server_stamp_ms: u64,
    /// Estimated `server_clock - local_clock`, once a heartbeat came back.
    clock_offset_ms: Option<i64>,
}

impl TimerMirror {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            snapshot: None,
            received_at_ms: 0,
            server_stamp_ms: 0,
            clock_offset_ms: None,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// The last authoritative snapshot, with presence folded in.
    pub fn snapshot(&self) -> Option<&TimerSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn clock_offset_ms(&self) -> Option<i64> {
        self.clock_offset_ms
    }

    /// Applies one server frame received at local time `local_now_ms`.
    ///
    /// Returns `true` if the mirror changed. Events for other rooms are
    /// ignored.
    pub fn apply(&mut self, envelope: &ServerEnvelope, local_now_ms: u64) -> bool {
        match &envelope.payload {
            ServerEvent::TimerUpdate(snapshot) => {
                self.replace(snapshot, envelope.timestamp, local_now_ms)
            }
            ServerEvent::Ack(Ack {
                ok: true,
                state: Some(snapshot),
                ..
            }) => self.replace(snapshot, envelope.timestamp, local_now_ms),
            ServerEvent::PresenceUpdate(presence) if presence.room_id == self.room_id => {
                match &mut self.snapshot {
                    Some(current) => {
                        current.participants = presence.participants.clone();
                        current.participant_usernames = presence.participant_usernames.clone();
                        true
                    }
                    None => false,
                }
            }
            ServerEvent::HeartbeatAck(ack) => {
                self.calibrate(ack, local_now_ms);
                true
            }
            _ => false,
        }
    }

    fn replace(&mut self, snapshot: &TimerSnapshot, server_stamp_ms: u64, local_now_ms: u64) -> bool {
        if snapshot.room_id != self.room_id {
            return false;
        }
        self.snapshot = Some(snapshot.clone());
        self.received_at_ms = local_now_ms;
        self.server_stamp_ms = server_stamp_ms;
        true
    }

    /// NTP-style offset from one heartbeat round trip. Values the server
    /// sends are untrusted, so the offset saturates instead of wrapping.
    fn calibrate(&mut self, ack: &HeartbeatAck, local_now_ms: u64) {
        let rtt = local_now_ms.saturating_sub(ack.client_time);
        let midpoint = ack.client_time.saturating_add(rtt / 2);
        let offset = i128::from(ack.server_time) - i128::from(midpoint);
        self.clock_offset_ms = Some(i64::try_from(offset).unwrap_or(if offset > 0 {
            i64::MAX
        } else {
            i64::MIN
        }));
    }

    /// Best estimate of the server clock at `local_now_ms`.
    fn server_time_at(&self, local_now_ms: u64) -> u64 {
        match self.clock_offset_ms {
            Some(offset) => local_now_ms.saturating_add_signed(offset),
            None => self
                .server_stamp_ms
                .saturating_add(local_now_ms.saturating_sub(self.received_at_ms)),
        }
    }

    /// Remaining seconds the client should display at `local_now_ms`.
    ///
    /// `None` until the first snapshot arrives. Never negative. Seconds tick
    /// on the same boundaries as the server's, counted from
    /// `start_at_epoch_ms`.
    pub fn remaining_at(&self, local_now_ms: u64) -> Option<u32> {
        let snapshot = self.snapshot.as_ref()?;
        if !snapshot.is_running {
            return Some(snapshot.remaining_seconds);
        }
        let anchor = snapshot.start_at_epoch_ms.unwrap_or(self.server_stamp_ms);
        let whole_seconds_since_start = |t: u64| t.saturating_sub(anchor) / 1000;
        let ticked = whole_seconds_since_start(self.server_time_at(local_now_ms))
            .saturating_sub(whole_seconds_since_start(self.server_stamp_ms));
        let ticked = u32::try_from(ticked).unwrap_or(u32::MAX);
        Some(snapshot.remaining_seconds.saturating_sub(ticked))
    }

    /// Whether the local countdown is still ticking at `local_now_ms`.
    /// A running timer that has reached zero locally reads as stopped.
    pub fn is_running_at(&self, local_now_ms: u64) -> bool {
        match &self.snapshot {
            Some(s) if s.is_running => self.remaining_at(local_now_ms).unwrap_or(0) > 0,
            _ => false,
        }
    }

    pub fn mode(&self) -> Option<TimerMode> {
        self.snapshot.as_ref().map(|s| s.mode)
    }
}
