//! One-shot notification event
//!
//! Carries the unload signal from the lifecycle controller to the worker.
//! Once set, an event stays set and every waiter, present or future,
//! observes it. Platform-specific implementations use the most efficient
//! primitive available.

use std::time::Duration;

/// Notification event
pub trait NotificationEvent: Send + Sync {
    /// Signal the event and wake every waiter
    fn set(&self);

    /// Non-blocking check
    fn is_set(&self) -> bool;

    /// Wait until the event is set or `timeout` elapses.
    ///
    /// `None` waits indefinitely; `Some(Duration::ZERO)` only checks.
    /// Returns `true` if the event is set.
    fn wait(&self, timeout: Option<Duration>) -> bool;
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub use futex_linux::FutexEvent as Event;
    } else {
        mod fallback;
        pub use fallback::CondvarEvent as Event;
    }
}
