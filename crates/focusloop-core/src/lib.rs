//! # Focusloop Core Library
//!
//! This library provides the core logic for the Focusloop focus/break timer.
//! It implements a CLI-first philosophy where all operations are available
//! via a standalone CLI binary; any GUI would be a thin layer over the same
//! core library.
//!
//! ## Architecture
//!
//! - **Session Engine**: a wall-clock-anchored state machine that requires
//!   the caller to periodically invoke `tick()` while a session runs.
//!   Remaining time is derived from the anchor timestamp, so the countdown
//!   survives missed ticks, host suspension and process restarts without
//!   drift.
//! - **Storage**: SQLite-based session-state/progress persistence and
//!   TOML-based configuration.
//! - **Gateways**: injected contracts for notifications, the progress log
//!   and the visibility signal; all advisory, none able to corrupt the
//!   timer.
//!
//! ## Key Components
//!
//! - [`PomodoroEngine`]: core session state machine
//! - [`Database`]: session-state and work-progress persistence
//! - [`Config`]: application configuration management
//! - [`Notifier`] / [`ProgressLog`]: external collaborator contracts

pub mod error;
pub mod events;
pub mod gateway;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, StoreError};
pub use events::Event;
pub use gateway::{NoopNotifier, NoopProgressLog, Notifier, ProgressLog, Visibility};
pub use storage::{Config, Database, Stats};
pub use timer::{Mode, PomodoroEngine, SessionState};
