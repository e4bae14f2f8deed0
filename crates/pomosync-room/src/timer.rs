//! Time reconciliation: what the countdown reads right now.
//!
//! The server never ticks. It stores the countdown as of the last command
//! and the instant the current run began, and derives the live value on
//! demand. Every broadcast and every sync reply goes through
//! [`effective_remaining`].

use crate::RoomState;

/// Remaining whole seconds at `now_ms`.
///
/// Stopped rooms return the stored value. Running rooms subtract the whole
/// seconds elapsed since the run began, clamped at zero. A `now_ms` earlier
/// than the start (clock stepped backwards) counts as zero elapsed.
pub fn effective_remaining(room: &RoomState, now_ms: u64) -> u32 {
    match room.started_at_ms() {
        None => room.remaining_seconds(),
        Some(started_at) => {
            let elapsed_secs = now_ms.saturating_sub(started_at) / 1000;
            let elapsed_secs = u32::try_from(elapsed_secs).unwrap_or(u32::MAX);
            room.remaining_seconds().saturating_sub(elapsed_secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use pomosync_protocol::{ParticipantId, RoomId};

    use super::*;

    fn room(remaining: u32, started_at: Option<u64>) -> RoomState {
        let mut room = RoomState::new(RoomId::from("R1"), ParticipantId(1), "Alice".into(), remaining);
        room.started_at_ms = started_at;
        room
    }

    #[test]
    fn test_stopped_room_returns_stored_value() {
        assert_eq!(effective_remaining(&room(1500, None), 99_999_999), 1500);
    }

    #[test]
    fn test_running_room_floors_elapsed_seconds() {
        let r = room(1500, Some(10_000));
        assert_eq!(effective_remaining(&r, 10_000), 1500);
        assert_eq!(effective_remaining(&r, 10_999), 1500);
        assert_eq!(effective_remaining(&r, 11_000), 1499);
        assert_eq!(effective_remaining(&r, 20_000), 1490);
    }

    #[test]
    fn test_running_room_clamps_at_zero() {
        let r = room(5, Some(0));
        assert_eq!(effective_remaining(&r, 60_000), 0);
        assert_eq!(effective_remaining(&r, u64::MAX), 0);
    }

    #[test]
    fn test_clock_behind_start_counts_as_no_elapsed_time() {
        let r = room(100, Some(50_000));
        assert_eq!(effective_remaining(&r, 10_000), 100);
    }

    #[test]
    fn test_non_increasing_while_running() {
        let r = room(30, Some(1_000));
        let mut last = effective_remaining(&r, 0);
        for now in (0..40_000).step_by(250) {
            let current = effective_remaining(&r, now);
            assert!(current <= last, "went up at {now}: {last} -> {current}");
            last = current;
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn test_does_not_mutate_room() {
        let r = room(100, Some(0));
        let before = r.clone();
        let _ = effective_remaining(&r, 50_000);
        assert_eq!(r, before);
    }
}
