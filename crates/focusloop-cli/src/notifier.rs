use focusloop_core::Notifier;
use notify_rust::Notification;

/// Notification gateway backed by the OS notification service.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        // No daemon, headless session, denied by the OS: all advisory.
        if let Err(e) = Notification::new().summary(title).body(body).show() {
            log::debug!("notification dispatch failed: {e}");
        }
    }
}
