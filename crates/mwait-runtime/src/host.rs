//! Hosted thread management
//!
//! `StdHost` realizes the `ThreadHost` capability with `std::thread`. A
//! registry maps each identity to its join handle: resolving an identity
//! is a registry lookup, and releasing the handle is removing it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use mwait_core::{EngineResult, SpawnError, ThreadHost, ThreadIdentity};

/// `std::thread` backed host
pub struct StdHost {
    registry: Mutex<HashMap<ThreadIdentity, JoinHandle<()>>>,
    stack_size: Option<usize>,
}

impl StdHost {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            stack_size: None,
        }
    }

    /// Spawn threads with an explicit stack size
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Number of threads spawned and not yet joined
    pub fn live_threads(&self) -> usize {
        self.registry().len()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<ThreadIdentity, JoinHandle<()>>> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for StdHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadHost for StdHost {
    fn spawn<F>(&self, name: &str, entry: F) -> EngineResult<ThreadIdentity>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut builder = thread::Builder::new().name(name.to_string());
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        // Hold the registry across spawn so the identity resolves as soon
        // as anyone else can learn it.
        let mut registry = self.registry();
        let handle = builder
            .spawn(entry)
            .map_err(|e| SpawnError::Os(e.raw_os_error().unwrap_or(0)))?;

        let id = ThreadIdentity::next();
        registry.insert(id, handle);
        Ok(id)
    }

    fn join(&self, id: ThreadIdentity) -> bool {
        let handle = self.registry().remove(&id);
        match handle {
            Some(handle) => {
                if handle.join().is_err() {
                    mwait_core::kerror!("Thread {} panicked", id);
                }
                true
            }
            None => false,
        }
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }

    #[inline]
    fn cycles(&self) -> u64 {
        crate::arch::cycles()
    }
}
