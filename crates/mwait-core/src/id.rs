//! Thread identity and roles

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Host-assigned identity of an engine thread
///
/// Identities are handed out by the `ThreadHost` at spawn time and later
/// resolved back to a joinable thread. Zero is reserved for "no thread".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ThreadIdentity(u64);

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

impl ThreadIdentity {
    /// No thread
    pub const NONE: ThreadIdentity = ThreadIdentity(0);

    /// Allocate a fresh, process-unique identity
    pub fn next() -> Self {
        ThreadIdentity(NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed))
    }

    /// Create an identity from a raw value
    #[inline]
    pub const fn new(raw: u64) -> Self {
        ThreadIdentity(raw)
    }

    /// Get the raw value
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Check if this is the NONE identity
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for ThreadIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "ThreadIdentity(NONE)")
        } else {
            write!(f, "ThreadIdentity({})", self.0)
        }
    }
}

impl fmt::Display for ThreadIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for ThreadIdentity {
    fn default() -> Self {
        ThreadIdentity::NONE
    }
}

/// Which engine thread a placement or spawn request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Owns the cell, mutates it and drives shutdown
    Worker,
    /// Arms the hardware watch and reports stores
    Monitor,
}

impl Role {
    /// Thread name used when spawning this role
    pub const fn thread_name(self) -> &'static str {
        match self {
            Role::Worker => "mwait-worker",
            Role::Monitor => "mwait-monitor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Worker => write!(f, "worker"),
            Role::Monitor => write!(f, "monitor"),
        }
    }
}
