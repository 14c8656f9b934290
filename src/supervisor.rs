//! Notifications to the process manager supervising this service.

use sd_notify::NotifyState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Ready,
    Status(String),
    Watchdog,
    Stopping,
}

impl Notification {
    pub fn status(text: &str) -> Self {
        Self::Status(text.to_string())
    }
}

/// Fire-and-forget notification channel. Implementations must never fail
/// loudly: a missing supervisor is normal.
pub trait Supervisor: Send + Sync + 'static {
    fn notify(&self, notification: &Notification);
}

/// The systemd notify protocol over `$NOTIFY_SOCKET`. Without the variable
/// every call is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemdNotifier;

impl Supervisor for SystemdNotifier {
    fn notify(&self, notification: &Notification) {
        let state = match notification {
            Notification::Ready => NotifyState::Ready,
            Notification::Status(text) => NotifyState::Status(text),
            Notification::Watchdog => NotifyState::Watchdog,
            Notification::Stopping => NotifyState::Stopping,
        };
        if let Err(e) = sd_notify::notify(false, &[state]) {
            tracing::debug!("supervisor notification failed: {e}");
        }
    }
}
