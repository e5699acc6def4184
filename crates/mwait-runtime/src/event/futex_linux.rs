//! Linux futex-based event
//!
//! Futex word semantics:
//! - 0 = not signaled
//! - 1 = signaled
//!
//! Waiters FUTEX_WAIT while the word is 0; `set` stores 1 and wakes all.

use super::NotificationEvent;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Linux futex-based event
pub struct FutexEvent {
    word: AtomicU32,
}

impl FutexEvent {
    /// Create an event in the not-signaled state
    pub fn new() -> Self {
        Self {
            word: AtomicU32::new(0),
        }
    }

    fn futex_wait(&self, timeout: Option<Duration>) {
        let timespec = timeout.map(|d| libc::timespec {
            tv_sec: d.as_secs() as libc::time_t,
            tv_nsec: d.subsec_nanos() as libc::c_long,
        });
        let timespec_ptr = match &timespec {
            Some(ts) => ts as *const libc::timespec,
            None => std::ptr::null(),
        };

        // ETIMEDOUT, EAGAIN (already set) and EINTR all send the caller
        // back to re-check the word.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.word.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                0u32,
                timespec_ptr,
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }

    fn futex_wake_all(&self) {
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.word.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                i32::MAX,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }
}

impl Default for FutexEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationEvent for FutexEvent {
    fn set(&self) {
        if self.word.swap(1, Ordering::AcqRel) == 0 {
            self.futex_wake_all();
        }
    }

    #[inline]
    fn is_set(&self) -> bool {
        self.word.load(Ordering::Acquire) != 0
    }

    fn wait(&self, timeout: Option<Duration>) -> bool {
        if self.is_set() {
            return true;
        }
        if timeout == Some(Duration::ZERO) {
            return false;
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return self.is_set();
                    }
                    Some(deadline - now)
                }
                None => None,
            };

            self.futex_wait(remaining);

            if self.is_set() {
                return true;
            }
        }
    }
}
