//! Shared device context
//!
//! One instance per load. Thread identities are written once by the thread
//! that spawns them and only read afterwards; the unload event is the only
//! cross-thread signal the worker waits on.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use mwait_core::{DeviceHandle, MonitorDescriptor, ThreadIdentity};

use crate::event::{Event, NotificationEvent};
use crate::monitor::MonitorStats;
use crate::worker::WorkerStats;

/// Worker state machine position
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    /// Not started yet
    Idle = 0,
    /// Pinning itself, creating the monitor and waiting for it to pin
    Starting = 1,
    /// Mutating the cell and polling for unload
    Running = 2,
    /// Sentinel written, waiting for the monitor
    ShuttingDown = 3,
    /// Monitor joined (or unresolvable); worker is returning
    Joined = 4,
    /// Startup failed; the worker never ran
    Failed = 5,
}

impl WorkerPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => WorkerPhase::Starting,
            2 => WorkerPhase::Running,
            3 => WorkerPhase::ShuttingDown,
            4 => WorkerPhase::Joined,
            5 => WorkerPhase::Failed,
            _ => WorkerPhase::Idle,
        }
    }

    /// Terminal phases
    pub fn is_done(self) -> bool {
        matches!(self, WorkerPhase::Joined | WorkerPhase::Failed)
    }
}

/// State shared by the controller, the worker and the monitor
pub struct DeviceContext {
    worker: OnceLock<ThreadIdentity>,
    monitor: OnceLock<ThreadIdentity>,
    unload: Event,
    monitor_ready: Event,
    monitor_started: OnceLock<bool>,
    descriptor: MonitorDescriptor,
    device: DeviceHandle,
    phase: AtomicU8,
    worker_stats: OnceLock<WorkerStats>,
    monitor_stats: OnceLock<MonitorStats>,
}

impl DeviceContext {
    pub fn new(descriptor: MonitorDescriptor, device: DeviceHandle) -> Self {
        Self {
            worker: OnceLock::new(),
            monitor: OnceLock::new(),
            unload: Event::new(),
            monitor_ready: Event::new(),
            monitor_started: OnceLock::new(),
            descriptor,
            device,
            phase: AtomicU8::new(WorkerPhase::Idle as u8),
            worker_stats: OnceLock::new(),
            monitor_stats: OnceLock::new(),
        }
    }

    pub fn descriptor(&self) -> &MonitorDescriptor {
        &self.descriptor
    }

    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    /// Signal the worker to shut down
    pub fn signal_unload(&self) {
        self.unload.set();
    }

    /// Non-blocking unload check
    pub fn unload_requested(&self) -> bool {
        self.unload.wait(Some(std::time::Duration::ZERO))
    }

    /// Record whether the monitor got through placement. The first call
    /// wins and releases `await_monitor_start`.
    pub(crate) fn report_monitor_start(&self, started: bool) {
        let _ = self.monitor_started.set(started);
        self.monitor_ready.set();
    }

    /// Block until the monitor has reported its startup result
    pub(crate) fn await_monitor_start(&self) -> bool {
        self.monitor_ready.wait(None);
        self.monitor_started.get().copied().unwrap_or(false)
    }

    pub fn worker_identity(&self) -> Option<ThreadIdentity> {
        self.worker.get().copied()
    }

    pub fn monitor_identity(&self) -> Option<ThreadIdentity> {
        self.monitor.get().copied()
    }

    pub(crate) fn set_worker_identity(&self, id: ThreadIdentity) {
        let _ = self.worker.set(id);
    }

    pub(crate) fn set_monitor_identity(&self, id: ThreadIdentity) {
        let _ = self.monitor.set(id);
    }

    pub fn phase(&self) -> WorkerPhase {
        WorkerPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn set_phase(&self, phase: WorkerPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    pub fn worker_stats(&self) -> Option<WorkerStats> {
        self.worker_stats.get().cloned()
    }

    pub fn monitor_stats(&self) -> Option<MonitorStats> {
        self.monitor_stats.get().cloned()
    }

    pub(crate) fn record_worker_stats(&self, stats: WorkerStats) {
        let _ = self.worker_stats.set(stats);
    }

    pub(crate) fn record_monitor_stats(&self, stats: MonitorStats) {
        let _ = self.monitor_stats.set(stats);
    }
}
