//! Capability traits
//!
//! These traits define the interface between the platform-agnostic engine
//! types and the platform-specific runtime. Each one models a service the
//! engine calls into: the hardware wait, CPU placement, thread management,
//! mutation traffic and host device registration.

use std::path::PathBuf;
use std::time::Duration;

use crate::cell::MonitorDescriptor;
use crate::error::{DeviceError, EngineResult, PlacementError};
use crate::id::{Role, ThreadIdentity};

/// Arm-and-wait hardware primitive
///
/// `arm_and_wait` arms a watch on the cache line holding the target word
/// and suspends the caller until a store hits that line or the wait exits
/// early for an unrelated reason. The return carries no cause: every
/// return means "maybe changed" and the caller must re-read the value.
///
/// Asynchronous event delivery is one of the early-exit causes, so callers
/// hold the guard returned by `suppress` from before arming until the wait
/// returns, and drop it immediately after.
pub trait WaitCapability: Send + Sync + 'static {
    /// Scoped suppression of asynchronous events; lifted on drop
    type Guard;

    /// Suppress asynchronous event delivery on the current thread
    fn suppress(&self) -> Self::Guard;

    /// Arm the watch on `target` and wait
    fn arm_and_wait(&self, target: &MonitorDescriptor);

    /// Backend name for diagnostics
    fn name(&self) -> &'static str;
}

/// Placement policy applied once at thread start
pub trait Placement: Send + Sync {
    /// Bind the calling thread to `cpu`
    fn apply(&self, role: Role, cpu: usize) -> Result<(), PlacementError>;

    /// CPU the calling thread is executing on, if the policy can tell
    fn current_cpu(&self) -> Option<usize>;
}

/// Host thread-management primitives
pub trait ThreadHost: Send + Sync + 'static {
    /// Create a thread running `entry` and return its identity
    fn spawn<F>(&self, name: &str, entry: F) -> EngineResult<ThreadIdentity>
    where
        F: FnOnce() + Send + 'static;

    /// Resolve `id` and block until that thread exits, releasing its handle.
    ///
    /// Returns `false` when the identity cannot be resolved; the caller
    /// proceeds without waiting.
    fn join(&self, id: ThreadIdentity) -> bool;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);

    /// High-resolution cycle counter
    fn cycles(&self) -> u64;
}

/// Source of the worker's periodic write traffic
pub trait MutationSource: Send {
    /// Value to store on this iteration, if any
    fn next(&mut self, tick: u64) -> Option<u64>;
}

/// A registered device endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// Endpoint name
    pub name: String,
    /// Host location of the endpoint
    pub location: PathBuf,
}

/// A registered alias for a device endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasHandle {
    /// Alias name
    pub name: String,
    /// Host location of the alias
    pub location: PathBuf,
}

/// Host device registration
///
/// Undo calls are only made for objects that were actually created, in
/// reverse order of creation.
pub trait DeviceHost: Send + Sync {
    /// Register a named device endpoint
    fn create_device(&self, name: &str) -> Result<DeviceHandle, DeviceError>;

    /// Register `alias` as another name for `device`
    fn create_alias(&self, alias: &str, device: &DeviceHandle) -> Result<AliasHandle, DeviceError>;

    /// Remove an alias
    fn delete_alias(&self, alias: AliasHandle);

    /// Remove a device endpoint
    fn delete_device(&self, device: DeviceHandle);
}
