//! Portable fallbacks for architectures without MONITOR/MWAIT

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Monotonic nanoseconds since first use, standing in for a cycle counter
#[inline]
pub fn cycles() -> u64 {
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// No hardware monitor on this architecture
#[inline]
pub fn cpu_supports_monitor() -> bool {
    false
}

/// No user-mode wait on this architecture
#[inline]
pub fn cpu_supports_waitpkg() -> bool {
    false
}
