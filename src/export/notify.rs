//! User-facing progress, success and failure messages

use std::sync::Mutex;

pub const FAILURE_MESSAGE: &str = "Gagal membuat laporan, silakan coba lagi.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Progress,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn progress(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Progress,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    /// Generic retry message followed by the cause.
    pub fn failure(cause: impl std::fmt::Display) -> Self {
        Self {
            kind: NotificationKind::Failure,
            message: format!("{} ({})", FAILURE_MESSAGE, cause),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, n: Notification) {
        match n.kind {
            NotificationKind::Progress => log::info!("{}", n.message),
            NotificationKind::Success => log::info!("{}", n.message),
            NotificationKind::Failure => log::error!("{}", n.message),
        }
    }
}

/// Keeps notifications in memory so tests can assert on them
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.notifications().iter().map(|n| n.kind).collect()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_keeps_order() {
        let n = RecordingNotifier::new();
        n.notify(Notification::progress("Membuat laporan..."));
        n.notify(Notification::failure("boom"));
        assert_eq!(n.kinds(), vec![NotificationKind::Progress, NotificationKind::Failure]);
        let last = n.notifications().pop().unwrap();
        assert!(last.message.starts_with(FAILURE_MESSAGE));
        assert!(last.message.contains("boom"));
    }
}
