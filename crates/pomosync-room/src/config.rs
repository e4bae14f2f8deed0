//! Timer configuration: the per-mode duration table.

use pomosync_protocol::TimerMode;
use serde::{Deserialize, Serialize};

/// Durations, in seconds, that reset and mode change jump to.
///
/// The defaults are the classic Pomodoro table: 25 minutes of focus,
/// 5 minute short break, 15 minute long break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    pub pomodoro_secs: u32,
    pub short_break_secs: u32,
    pub long_break_secs: u32,

    /// Used by `create_room` when the client sends no duration, or a
    /// non-positive one.
    pub default_duration_secs: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            pomodoro_secs: 1500,
            short_break_secs: 300,
            long_break_secs: 900,
            default_duration_secs: 1500,
        }
    }
}

impl TimerConfig {
    /// The canonical duration for `mode`.
    pub fn duration_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Pomodoro => self.pomodoro_secs,
            TimerMode::ShortBreak => self.short_break_secs,
            TimerMode::LongBreak => self.long_break_secs,
        }
    }

    /// Resolves a client-requested creation duration.
    pub fn initial_duration(&self, requested: Option<i64>) -> u32 {
        match requested {
            Some(secs) if secs > 0 => u32::try_from(secs).unwrap_or(u32::MAX),
            _ => self.default_duration_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_duration_table() {
        let config = TimerConfig::default();
        assert_eq!(config.duration_for(TimerMode::Pomodoro), 1500);
        assert_eq!(config.duration_for(TimerMode::ShortBreak), 300);
        assert_eq!(config.duration_for(TimerMode::LongBreak), 900);
    }

    #[test]
    fn test_initial_duration_falls_back_on_missing_or_non_positive() {
        let config = TimerConfig::default();
        assert_eq!(config.initial_duration(None), 1500);
        assert_eq!(config.initial_duration(Some(0)), 1500);
        assert_eq!(config.initial_duration(Some(-30)), 1500);
        assert_eq!(config.initial_duration(Some(600)), 600);
        assert_eq!(config.initial_duration(Some(i64::MAX)), u32::MAX);
    }
}
