//! Pomodoro session engine.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads - the caller is responsible for calling `tick()` periodically
//! while a session runs.
//!
//! Remaining time is derived, not counted: every evaluation recomputes
//! `duration - (now - anchor)` against the anchor recorded at start, so a
//! tick callback's only job is to refresh that value and detect the zero
//! crossing. Missed ticks (suspended host, closed process) cost nothing.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = PomodoroEngine::new(config, &notifier, &progress);
//! engine.start();
//! // In a loop, once per second while running:
//! engine.tick(); // Returns Some(Event::SessionCompleted) on zero-crossing
//! ```

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};

use super::session::{Mode, SessionState};
use crate::events::Event;
use crate::gateway::{Notifier, ProgressLog, Visibility};
use crate::storage::{Config, DurationsConfig};

/// Core session engine.
///
/// Owns the settings and the resumable session state; talks to its
/// collaborators only through the injected gateway references. Every control
/// operation is total - side-effect failures are swallowed, never surfaced.
pub struct PomodoroEngine<'a> {
    config: Config,
    state: SessionState,
    notifier: &'a dyn Notifier,
    progress: &'a dyn ProgressLog,
    /// Cached permission answer; asked lazily at the first dispatch attempt.
    permission: Option<bool>,
    /// Anchor captured when auto-pause stopped a running session on blur.
    /// Distinguishes "was running before being hidden" from a deliberate
    /// user pause. Runtime-only: never persisted, cleared by any manual
    /// control operation.
    suspended_anchor: Option<u64>,
    /// One-shot latch: the first visibility observation after construction
    /// never triggers a resume.
    visibility_primed: bool,
}

impl<'a> PomodoroEngine<'a> {
    /// Create an engine with first-use defaults: a full work session, idle.
    pub fn new(config: Config, notifier: &'a dyn Notifier, progress: &'a dyn ProgressLog) -> Self {
        let state = SessionState::initial(&config);
        Self {
            config,
            state,
            notifier,
            progress,
            permission: None,
            suspended_anchor: None,
            visibility_primed: false,
        }
    }

    /// Rebuild an engine from a persisted session state.
    ///
    /// Runs reload reconciliation: a session that ran out while no process
    /// was alive completes now (the event is returned for the caller to
    /// surface); a session still mid-flight adopts the reduced remaining
    /// time but is forced paused. Sessions never silently resume running
    /// after a reload.
    pub fn restore(
        config: Config,
        state: SessionState,
        notifier: &'a dyn Notifier,
        progress: &'a dyn ProgressLog,
    ) -> (Self, Option<Event>) {
        Self::restore_at(config, state, notifier, progress, now_ms())
    }

    /// `restore` against an explicit wall-clock reading.
    pub fn restore_at(
        config: Config,
        state: SessionState,
        notifier: &'a dyn Notifier,
        progress: &'a dyn ProgressLog,
        now_ms: u64,
    ) -> (Self, Option<Event>) {
        let mut engine = Self {
            config,
            state,
            notifier,
            progress,
            permission: None,
            suspended_anchor: None,
            visibility_primed: false,
        };
        let event = engine.reconcile_at(now_ms);
        (engine, event)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn view_mode(&self) -> Mode {
        self.state.view_mode
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn cycle_count(&self) -> u32 {
        self.state.cycle_count
    }

    pub fn focus_mode(&self) -> bool {
        self.state.focus_mode
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The resumable record, for persistence between process runs.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Seconds left, derived against the current wall clock while running.
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_at(now_ms())
    }

    /// Seconds left, derived against an explicit wall-clock reading.
    /// Always within `[0, duration_for(mode)]`, even if the clock moved
    /// backward past the anchor.
    pub fn remaining_at(&self, now_ms: u64) -> u32 {
        let duration = self.duration_for(self.state.mode);
        match (self.state.is_running, self.state.anchor_epoch_ms) {
            (true, Some(anchor)) => {
                let elapsed_secs = now_ms.saturating_sub(anchor) / 1000;
                let elapsed = u32::try_from(elapsed_secs).unwrap_or(u32::MAX);
                duration.saturating_sub(elapsed)
            }
            _ => self.state.remaining_secs.min(duration),
        }
    }

    /// 0.0 .. 1.0 progress within the current session.
    pub fn progress(&self) -> f64 {
        self.progress_at(now_ms())
    }

    pub fn progress_at(&self, now_ms: u64) -> f64 {
        let total = self.duration_for(self.state.mode);
        if total == 0 {
            return 0.0;
        }
        1.0 - f64::from(self.remaining_at(now_ms)) / f64::from(total)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        self.snapshot_at(now_ms())
    }

    pub fn snapshot_at(&self, now_ms: u64) -> Event {
        Event::StateSnapshot {
            mode: self.state.mode,
            view_mode: self.state.view_mode,
            is_running: self.state.is_running,
            remaining_secs: self.remaining_at(now_ms),
            total_secs: self.duration_for(self.state.mode),
            cycle_count: self.state.cycle_count,
            focus_mode: self.state.focus_mode,
            at: datetime_from_ms(now_ms),
        }
    }

    // ── Control operations ───────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        self.start_at(now_ms())
    }

    /// Begin or resume the countdown. The anchor is back-dated by the time
    /// already elapsed, so resuming mid-session loses nothing. Calling
    /// `start` on an already-running session recomputes the same anchor.
    pub fn start_at(&mut self, now_ms: u64) -> Option<Event> {
        self.suspended_anchor = None;
        if self.state.is_running {
            self.refresh_remaining_at(now_ms);
        }
        let duration = self.duration_for(self.state.mode);
        let remaining = self.state.remaining_secs.min(duration);
        if remaining == 0 {
            return None;
        }
        self.state.remaining_secs = remaining;
        self.state.is_running = true;
        self.state.anchor_epoch_ms =
            Some(now_ms.saturating_sub(u64::from(duration - remaining) * 1000));
        if self.state.mode.is_work() {
            self.state.work_session_start = remaining;
        }
        Some(Event::SessionStarted {
            mode: self.state.mode,
            remaining_secs: remaining,
            at: datetime_from_ms(now_ms),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        self.pause_at(now_ms())
    }

    pub fn pause_at(&mut self, now_ms: u64) -> Option<Event> {
        self.suspended_anchor = None;
        if !self.state.is_running {
            return None;
        }
        self.refresh_remaining_at(now_ms);
        let at = datetime_from_ms(now_ms);
        self.flush_progress(at);
        self.state.is_running = false;
        self.state.anchor_epoch_ms = None;
        Some(Event::SessionPaused {
            mode: self.state.mode,
            remaining_secs: self.state.remaining_secs,
            at,
        })
    }

    /// Back to the full duration of the current mode, stopped.
    pub fn reset(&mut self) -> Option<Event> {
        self.reset_at(now_ms())
    }

    pub fn reset_at(&mut self, now_ms: u64) -> Option<Event> {
        self.suspended_anchor = None;
        if self.state.is_running {
            self.refresh_remaining_at(now_ms);
        }
        let at = datetime_from_ms(now_ms);
        self.flush_progress(at);
        self.state.remaining_secs = self.duration_for(self.state.mode);
        self.state.is_running = false;
        self.state.anchor_epoch_ms = None;
        Some(Event::SessionReset {
            mode: self.state.mode,
            remaining_secs: self.state.remaining_secs,
            at,
        })
    }

    /// Treat the current session as completed right now, regardless of
    /// remaining time. A skipped work session still advances the cycle.
    pub fn skip(&mut self) -> Option<Event> {
        self.skip_at(now_ms())
    }

    pub fn skip_at(&mut self, now_ms: u64) -> Option<Event> {
        self.suspended_anchor = None;
        if self.state.is_running {
            self.refresh_remaining_at(now_ms);
        }
        self.flush_progress(datetime_from_ms(now_ms));
        self.state.is_running = false;
        self.state.anchor_epoch_ms = None;
        let finished = self.state.mode;
        Some(self.complete_at(finished, now_ms))
    }

    /// Switch the active session kind. Never touches the cycle count.
    pub fn switch_mode(&mut self, mode: Mode) -> Option<Event> {
        self.switch_mode_at(mode, now_ms())
    }

    pub fn switch_mode_at(&mut self, mode: Mode, now_ms: u64) -> Option<Event> {
        self.suspended_anchor = None;
        if self.state.is_running {
            self.refresh_remaining_at(now_ms);
        }
        let at = datetime_from_ms(now_ms);
        self.flush_progress(at);
        let from = self.state.mode;
        self.state.mode = mode;
        self.state.view_mode = mode;
        self.state.remaining_secs = self.duration_for(mode);
        self.state.is_running = false;
        self.state.anchor_epoch_ms = None;
        Some(Event::ModeSwitched {
            from,
            to: mode,
            remaining_secs: self.state.remaining_secs,
            at,
        })
    }

    pub fn tick(&mut self) -> Option<Event> {
        self.tick_at(now_ms())
    }

    /// Call periodically while running. Returns the completion event on
    /// zero-crossing. A tick that outlived a `reset()`/`pause()` carries no
    /// authority: without a live anchor it is discarded.
    pub fn tick_at(&mut self, now_ms: u64) -> Option<Event> {
        if !self.state.is_running || self.state.anchor_epoch_ms.is_none() {
            return None;
        }
        self.refresh_remaining_at(now_ms);
        if self.state.remaining_secs == 0 {
            self.state.is_running = false;
            self.state.anchor_epoch_ms = None;
            let finished = self.state.mode;
            return Some(self.complete_at(finished, now_ms));
        }
        None
    }

    // ── Visibility ───────────────────────────────────────────────────

    pub fn on_visibility(&mut self, visibility: Visibility) -> Option<Event> {
        self.on_visibility_at(visibility, now_ms())
    }

    pub fn on_visibility_at(&mut self, visibility: Visibility, now_ms: u64) -> Option<Event> {
        let primed = self.visibility_primed;
        self.visibility_primed = true;
        match visibility {
            Visibility::Hidden => {
                if self.config.behavior.auto_pause_on_blur && self.state.is_running {
                    let anchor = self.state.anchor_epoch_ms;
                    let event = self.pause_at(now_ms);
                    // Keep the hide-time anchor so a later foreground can
                    // tell this auto-pause apart from a deliberate one.
                    self.suspended_anchor = anchor;
                    event
                } else {
                    None
                }
            }
            Visibility::Visible => {
                if !primed {
                    return None;
                }
                if self.config.behavior.auto_resume_on_focus
                    && !self.state.is_running
                    && self.state.remaining_secs > 0
                    && self.suspended_anchor.is_some()
                {
                    self.start_at(now_ms)
                } else {
                    None
                }
            }
        }
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// Replace the whole configuration; `remaining` is re-clamped so a
    /// session never exceeds the new cap for its mode.
    pub fn update_config(&mut self, config: Config) {
        self.config = config;
        self.clamp_remaining();
    }

    pub fn set_durations(&mut self, work: u32, short: u32, long: u32) {
        self.config.durations = DurationsConfig { work, short, long };
        self.clamp_remaining();
    }

    pub fn set_long_interval(&mut self, sessions: u32) {
        self.config.behavior.long_interval = sessions;
    }

    pub fn set_auto_start_next(&mut self, enabled: bool) {
        self.config.behavior.auto_start_next = enabled;
    }

    pub fn set_auto_pause_on_blur(&mut self, enabled: bool) {
        self.config.behavior.auto_pause_on_blur = enabled;
    }

    pub fn set_auto_resume_on_focus(&mut self, enabled: bool) {
        self.config.behavior.auto_resume_on_focus = enabled;
    }

    pub fn set_notifications(&mut self, enabled: bool) {
        self.config.notifications.enabled = enabled;
    }

    pub fn set_focus_mode(&mut self, enabled: bool) {
        self.state.focus_mode = enabled;
    }

    /// Preview a session kind in the UI without touching the live timer.
    pub fn set_view_mode(&mut self, mode: Mode) {
        self.state.view_mode = mode;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn duration_for(&self, mode: Mode) -> u32 {
        self.config.duration_for(mode)
    }

    fn refresh_remaining_at(&mut self, now_ms: u64) {
        self.state.remaining_secs = self.remaining_at(now_ms);
    }

    fn clamp_remaining(&mut self) {
        let duration = self.duration_for(self.state.mode);
        if self.state.remaining_secs > duration {
            self.state.remaining_secs = duration;
        }
    }

    /// Append seconds-worked-so-far to the progress log and clear the
    /// baseline. No-op outside a work stretch.
    fn flush_progress(&mut self, at: DateTime<Utc>) {
        if self.state.mode.is_work() && self.state.work_session_start > 0 {
            let worked = self
                .state
                .work_session_start
                .saturating_sub(self.state.remaining_secs);
            if worked > 0 {
                if let Err(e) = self.progress.append_work(worked, at) {
                    warn!("progress log append failed: {e}");
                }
            }
        }
        self.state.work_session_start = 0;
    }

    /// The completion transition. Caller has already stopped the countdown
    /// and, for natural completions, driven `remaining` to zero.
    fn complete_at(&mut self, finished: Mode, now_ms: u64) -> Event {
        let at = datetime_from_ms(now_ms);
        let next = if finished.is_work() {
            self.flush_progress(at);
            if let Err(e) = self.progress.mark_today_complete(at) {
                warn!("daily completion marker failed: {e}");
            }
            self.notify("Work complete", "Time for a break.");
            self.state.cycle_count += 1;
            if self.state.cycle_count % self.config.behavior.long_interval == 0 {
                Mode::LongBreak
            } else {
                Mode::ShortBreak
            }
        } else {
            self.notify("Break complete", "Back to work.");
            Mode::Work
        };

        self.state.remaining_secs = self.duration_for(next);
        let auto_started = self.config.behavior.auto_start_next;
        if auto_started {
            self.state.is_running = true;
            self.state.anchor_epoch_ms = Some(now_ms);
            self.state.work_session_start = if next.is_work() {
                self.state.remaining_secs
            } else {
                0
            };
        } else {
            self.state.is_running = false;
            self.state.anchor_epoch_ms = None;
            self.state.work_session_start = 0;
            if next.is_work() {
                self.notify("Ready to start work", "Press start when you're ready.");
            }
        }
        self.state.mode = next;
        self.state.view_mode = next;
        self.suspended_anchor = None;

        Event::SessionCompleted {
            finished,
            next,
            cycle_count: self.state.cycle_count,
            auto_started,
            at,
        }
    }

    /// Reload reconciliation (see `restore`).
    fn reconcile_at(&mut self, now_ms: u64) -> Option<Event> {
        let duration = self.duration_for(self.state.mode);
        if self.state.is_running {
            if let Some(anchor) = self.state.anchor_epoch_ms {
                let elapsed_secs = now_ms.saturating_sub(anchor) / 1000;
                if elapsed_secs >= u64::from(duration) {
                    debug!("session overran while offline; applying completion");
                    self.state.is_running = false;
                    self.state.anchor_epoch_ms = None;
                    self.state.remaining_secs = 0;
                    let finished = self.state.mode;
                    return Some(self.complete_at(finished, now_ms));
                }
                self.state.remaining_secs = duration - elapsed_secs as u32;
                self.state.is_running = false;
                self.state.anchor_epoch_ms = None;
                return None;
            }
            // Running without an anchor is not a state this engine writes.
            warn!("persisted state had is_running without an anchor; forcing pause");
            self.state.is_running = false;
        }
        self.state.anchor_epoch_ms = None;
        self.state.remaining_secs = self.state.remaining_secs.min(duration);
        None
    }

    /// Best-effort dispatch, gated on the master switch and the cached
    /// permission answer. Failures never reach the caller.
    fn notify(&mut self, title: &str, body: &str) {
        if !self.config.notifications.enabled {
            return;
        }
        let granted = match self.permission {
            Some(granted) => granted,
            None => {
                let granted = self.notifier.request_permission();
                self.permission = Some(granted);
                granted
            }
        };
        if granted {
            self.notifier.notify(title, body);
        }
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn datetime_from_ms(epoch_ms: u64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(epoch_ms as i64)
        .single()
        .unwrap_or_else(Utc::now)
}
