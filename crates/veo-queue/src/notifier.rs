//! User-facing notifications.

use tracing::info;

/// Surfaces messages to the user. Calls must not block the engine.
pub trait Notifier: Send + Sync {
    /// Short, auto-dismissing message.
    fn notify_transient(&self, message: &str);

    /// OS-level notification.
    fn notify_system(&self, title: &str, body: &str);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_transient(&self, message: &str) {
        info!(kind = "transient", "{}", message);
    }

    fn notify_system(&self, title: &str, body: &str) {
        info!(kind = "system", title = %title, "{}", body);
    }
}
