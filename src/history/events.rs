//! Signals exchanged between the history controller and its collaborators
//!
//! The controller publishes [`HistoryEvent`]s on a `tokio::sync::broadcast`
//! channel. The "currently open conversation" is owned by the navigation
//! side and exposed to the controller as a read-only [`ActiveConversation`]
//! handle over a `tokio::sync::watch` channel.

use tokio::sync::watch;

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A message meant for the end user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Event published by the history controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    /// The open conversation was deleted; the receiver should navigate away
    ActiveRecordRemoved(String),
    /// Records were deleted, duplicated, or renamed
    HistoryChanged,
    /// Something to show the user
    Notice(Notice),
}

/// Read-only view of the currently open conversation id
///
/// # Examples
///
/// ```
/// use chathist::history::ActiveConversation;
///
/// let (tx, active) = ActiveConversation::channel(Some("abc".to_string()));
/// assert!(active.is_active("abc"));
///
/// tx.send_replace(None);
/// assert_eq!(active.current(), None);
/// ```
#[derive(Debug, Clone)]
pub struct ActiveConversation {
    rx: watch::Receiver<Option<String>>,
}

impl ActiveConversation {
    /// Create the pointer; the sender stays with the navigation collaborator
    pub fn channel(initial: Option<String>) -> (watch::Sender<Option<String>>, Self) {
        let (tx, rx) = watch::channel(initial);
        (tx, Self { rx })
    }

    /// A pointer that never has an open conversation
    pub fn none() -> Self {
        Self::channel(None).1
    }

    /// Id of the open conversation, if any
    pub fn current(&self) -> Option<String> {
        self.rx.borrow().clone()
    }

    /// Whether `id` is the open conversation
    pub fn is_active(&self, id: &str) -> bool {
        self.rx.borrow().as_deref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_has_no_active_conversation() {
        let active = ActiveConversation::none();
        assert_eq!(active.current(), None);
        assert!(!active.is_active(""));
    }

    #[test]
    fn test_active_conversation_follows_sender() {
        let (tx, active) = ActiveConversation::channel(None);
        tx.send_replace(Some("chat-1".to_string()));
        assert!(active.is_active("chat-1"));
        assert!(!active.is_active("chat-2"));
    }

    #[test]
    fn test_notice_constructors_set_level() {
        assert_eq!(Notice::success("ok").level, NoticeLevel::Success);
        assert_eq!(Notice::info("fyi").level, NoticeLevel::Info);
        assert_eq!(Notice::warning("hmm").level, NoticeLevel::Warning);
        assert_eq!(Notice::error("no").message, "no");
    }
}
