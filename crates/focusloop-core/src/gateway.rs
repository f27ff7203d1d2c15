//! External collaborator contracts.
//!
//! The engine never talks to a platform API directly -- the host hands it a
//! [`Notifier`] and a [`ProgressLog`] at construction and feeds it
//! [`Visibility`] changes as they happen. All three are advisory: a failing
//! or absent collaborator degrades to a no-op, never to a broken timer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Foreground/background signal from the hosting surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Best-effort notification capability.
pub trait Notifier: Send {
    /// Ask the platform for permission to notify. The engine caches the
    /// answer for its lifetime.
    fn request_permission(&self) -> bool {
        true
    }

    /// Fire-and-forget display. Implementations must not block the caller
    /// on delivery.
    fn notify(&self, title: &str, body: &str);
}

/// Notifier that discards everything. For headless embedding and tests.
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _title: &str, _body: &str) {}
}

/// Append-only sink for completed work seconds.
pub trait ProgressLog: Send {
    /// Record `seconds` of work ending at `at`.
    fn append_work(&self, seconds: u32, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Mark that `at`'s calendar day has at least one completed work
    /// session. Idempotent per day.
    fn mark_today_complete(&self, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Progress log that discards everything.
#[derive(Debug, Default)]
pub struct NoopProgressLog;

impl ProgressLog for NoopProgressLog {
    fn append_work(&self, _seconds: u32, _at: DateTime<Utc>) -> Result<(), StoreError> {
        Ok(())
    }

    fn mark_today_complete(&self, _at: DateTime<Utc>) -> Result<(), StoreError> {
        Ok(())
    }
}
