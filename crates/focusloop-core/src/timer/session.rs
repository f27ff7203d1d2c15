use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::storage::Config;

/// Session kind driving the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "work")]
    Work,
    #[serde(rename = "short")]
    ShortBreak,
    #[serde(rename = "long")]
    LongBreak,
}

impl Mode {
    pub fn is_work(self) -> bool {
        self == Mode::Work
    }

    pub fn is_break(self) -> bool {
        !self.is_work()
    }

    /// Wire token, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Work => "work",
            Mode::ShortBreak => "short",
            Mode::LongBreak => "long",
        }
    }

    /// Human label for notifications and status lines.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Work => "Work",
            Mode::ShortBreak => "Short break",
            Mode::LongBreak => "Long break",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(Mode::Work),
            "short" => Ok(Mode::ShortBreak),
            "long" => Ok(Mode::LongBreak),
            other => Err(format!("unknown mode '{other}' (expected work, short or long)")),
        }
    }
}

/// The resumable session record.
///
/// Mutated exclusively through [`PomodoroEngine`](crate::PomodoroEngine)
/// control operations and persisted between process runs via the store's
/// kv table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub mode: Mode,
    /// Kind the UI is currently showing; kept in sync with `mode` on every
    /// mode change.
    pub view_mode: Mode,
    /// Seconds left in the current session. Bounded by the configured
    /// duration for `mode`.
    pub remaining_secs: u32,
    pub is_running: bool,
    /// Wall-clock timestamp (ms since epoch) the countdown was (re)started
    /// against. Non-null iff `is_running`.
    #[serde(default)]
    pub anchor_epoch_ms: Option<u64>,
    /// Completed work sessions counted toward the long-break cadence.
    #[serde(default)]
    pub cycle_count: u32,
    /// UI-only flag, no countdown effect.
    #[serde(default)]
    pub focus_mode: bool,
    /// `remaining_secs` captured when a work session began running; zero
    /// outside a work stretch. Baseline for the progress-log flush.
    #[serde(default)]
    pub work_session_start: u32,
}

impl SessionState {
    /// First-use defaults: a full work session, idle, cycle 0.
    pub fn initial(config: &Config) -> Self {
        Self {
            mode: Mode::Work,
            view_mode: Mode::Work,
            remaining_secs: config.durations.work,
            is_running: false,
            anchor_epoch_ms: None,
            cycle_count: 0,
            focus_mode: false,
            work_session_start: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_wire_tokens() {
        assert_eq!(serde_json::to_string(&Mode::Work).unwrap(), "\"work\"");
        assert_eq!(serde_json::to_string(&Mode::ShortBreak).unwrap(), "\"short\"");
        assert_eq!(serde_json::to_string(&Mode::LongBreak).unwrap(), "\"long\"");
    }

    #[test]
    fn mode_from_str_roundtrip() {
        for mode in [Mode::Work, Mode::ShortBreak, Mode::LongBreak] {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
        assert!("lunch".parse::<Mode>().is_err());
    }

    #[test]
    fn initial_state_is_full_idle_work_session() {
        let config = Config::default();
        let state = SessionState::initial(&config);
        assert_eq!(state.mode, Mode::Work);
        assert_eq!(state.view_mode, Mode::Work);
        assert_eq!(state.remaining_secs, config.durations.work);
        assert!(!state.is_running);
        assert!(state.anchor_epoch_ms.is_none());
        assert_eq!(state.cycle_count, 0);
        assert_eq!(state.work_session_start, 0);
    }

    #[test]
    fn state_deserializes_without_optional_fields() {
        // Older persisted payloads may predate the focus/cycle fields.
        let json = r#"{"mode":"short","view_mode":"short","remaining_secs":120,"is_running":false}"#;
        let state: SessionState = serde_json::from_str(json).unwrap();
        assert_eq!(state.mode, Mode::ShortBreak);
        assert_eq!(state.cycle_count, 0);
        assert!(state.anchor_epoch_ms.is_none());
    }
}
