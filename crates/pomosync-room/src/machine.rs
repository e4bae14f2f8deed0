//! The room timer state machine.
//!
//! Each room is either Stopped or Running, crossed with its mode:
//!
//! ```text
//!            start                         pause
//!   Stopped ───────→ Running     Running ───────→ Stopped (countdown frozen)
//!
//!   reset / mode_change:  any ───→ Stopped at the mode's canonical duration
//!   adjust_time:          any ───→ same run state, stored countdown ± delta
//! ```
//!
//! A command that is not legal in the current state (start while running,
//! pause while stopped) is [`Transition::Ignored`]: no state change and no
//! broadcast, which makes repeated start/pause idempotent.

use pomosync_protocol::TimerMode;

use crate::{RoomState, TimerConfig, timer::effective_remaining};

/// A timer control command, already resolved to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Start,
    Pause,
    Reset,
    ChangeMode(TimerMode),
    AdjustTime(i64),
}

/// Outcome of applying a [`Control`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Transition {
    /// State changed; the room must be broadcast.
    Applied,
    /// Illegal in the current state; nothing changed, nothing to send.
    Ignored,
}

impl Transition {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Applies `control` to `room` at wall-clock `now_ms`.
pub fn apply(room: &mut RoomState, control: Control, now_ms: u64, config: &TimerConfig) -> Transition {
    match control {
        Control::Start => {
            if room.is_running() {
                return Transition::Ignored;
            }
            room.started_at_ms = Some(now_ms);
        }
        Control::Pause => {
            if !room.is_running() {
                return Transition::Ignored;
            }
            room.remaining_seconds = effective_remaining(room, now_ms);
            room.started_at_ms = None;
        }
        Control::Reset => {
            room.remaining_seconds = config.duration_for(room.mode);
            room.started_at_ms = None;
        }
        Control::ChangeMode(mode) => {
            room.mode = mode;
            room.remaining_seconds = config.duration_for(mode);
            room.started_at_ms = None;
        }
        Control::AdjustTime(delta) => {
            // Applied to the stored countdown, even mid-run: elapsed time of
            // the current run is not folded in first.
            let adjusted = i64::from(room.remaining_seconds).saturating_add(delta);
            room.remaining_seconds = u32::try_from(adjusted.max(0)).unwrap_or(u32::MAX);
        }
    }
    Transition::Applied
}
