//! Transient user notices ("toasts").
//!
//! Stores publish a notice for every user-visible outcome of an optimistic
//! mutation. Any number of views may subscribe; a notice published while
//! nobody listens is dropped.

use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A short message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    /// Whether this notice reports a failure.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.level, NoticeLevel::Error)
    }
}

/// Broadcasts notices to subscribers.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    /// Create a notifier with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Receive every notice published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    /// Publish a success notice.
    pub fn success(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Success, message.into());
    }

    /// Publish an error notice.
    pub fn error(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Error, message.into());
    }

    fn publish(&self, level: NoticeLevel, message: String) {
        tracing::debug!(?level, %message, "notice");
        // No receivers is fine
        let _ = self.sender.send(Notice { level, message });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_notices_in_order() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.success("Added to cart");
        notifier.error("Could not remove item");

        let first = rx.try_recv().unwrap();
        assert_eq!(first.level, NoticeLevel::Success);
        assert!(!first.is_error());

        let second = rx.try_recv().unwrap();
        assert!(second.is_error());
        assert_eq!(second.message, "Could not remove item");
    }

    #[test]
    fn test_publish_without_subscribers() {
        Notifier::new().error("nobody listening");
    }
}
