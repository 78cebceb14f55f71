//! Auto-dismissing notices, used for send failures.

use std::time::{Duration, Instant};

/// How long a toast stays on screen.
pub const TOAST_TTL: Duration = Duration::from_secs(5);

/// A transient error notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub message: String,
    shown_at: Instant,
}

impl Toast {
    pub fn new(title: impl Into<String>, message: impl Into<String>, now: Instant) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            shown_at: now,
        }
    }

    /// Toast for a failed send.
    pub fn send_failed(message: impl Into<String>, now: Instant) -> Self {
        Self::new("Send failed", message, now)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= TOAST_TTL
    }
}

/// Drop the toast once it has been shown for [`TOAST_TTL`].
pub fn expire(toast: &mut Option<Toast>, now: Instant) {
    if toast.as_ref().is_some_and(|t| t.is_expired(now)) {
        *toast = None;
    }
}
