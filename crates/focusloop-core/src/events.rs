use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Mode;

/// Every state change in the engine produces an Event.
/// The CLI prints them; an embedding UI would subscribe to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        mode: Mode,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        mode: Mode,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    SessionReset {
        mode: Mode,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    /// A session reached zero -- naturally via tick, by skip, or during
    /// reload reconciliation.
    SessionCompleted {
        finished: Mode,
        next: Mode,
        cycle_count: u32,
        auto_started: bool,
        at: DateTime<Utc>,
    },
    ModeSwitched {
        from: Mode,
        to: Mode,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        mode: Mode,
        view_mode: Mode,
        is_running: bool,
        remaining_secs: u32,
        total_secs: u32,
        cycle_count: u32,
        focus_mode: bool,
        at: DateTime<Utc>,
    },
}
