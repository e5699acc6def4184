//! Fallback event using std::sync::Condvar
//!
//! Used on platforms without futex support.

use super::NotificationEvent;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Condvar-based event (fallback)
pub struct CondvarEvent {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl CondvarEvent {
    /// Create an event in the not-signaled state
    pub fn new() -> Self {
        Self {
            signaled: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.signaled.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CondvarEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationEvent for CondvarEvent {
    fn set(&self) {
        *self.lock() = true;
        self.condvar.notify_all();
    }

    fn is_set(&self) -> bool {
        *self.lock()
    }

    fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut guard = self.lock();
        match timeout {
            None => {
                while !*guard {
                    guard = self
                        .condvar
                        .wait(guard)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
                true
            }
            Some(t) => {
                let deadline = Instant::now() + t;
                while !*guard {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    guard = self
                        .condvar
                        .wait_timeout(guard, deadline - now)
                        .map(|(g, _)| g)
                        .unwrap_or_else(|poisoned| poisoned.into_inner().0);
                }
                true
            }
        }
    }
}
