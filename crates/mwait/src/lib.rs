//! # mwait - store detection with MONITOR/MWAIT
//!
//! Two cooperating threads on two different CPUs:
//!
//! - the **worker** occasionally stores a new value into a shared cell
//! - the **monitor** arms the CPU's address monitor on that cell, sleeps
//!   until it is written, and reports every change it observes
//!
//! Unloading stores a sentinel value into the cell, which is how the
//! monitor learns to stop.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mwait::{Engine, EngineConfig};
//!
//! let engine = Engine::load(EngineConfig::from_env())?;
//! std::thread::sleep(std::time::Duration::from_secs(5));
//! for report in engine.reports() {
//!     println!("{}", report);
//! }
//! let summary = engine.unload();
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   Engine::load ──► device + alias ──► worker thread (cpu W)
//!                                          │ spawns
//!                                          ▼
//!   cell ◄──── store ──── worker       monitor thread (cpu M)
//!     │                                    │ arm + wait
//!     └────────── wakeup ─────────────────►│ sample, report
//! ```
//!
//! Custom capabilities (wait backend, thread host, device host, placement,
//! report sink, mutation source) plug in through `mwait_runtime::Parts`
//! and `Driver::load`.

use std::sync::Arc;

// Re-export core types
pub use mwait_core::{
    CellWriter, DeviceError, EngineError, EngineResult, MonitorDescriptor, MonitoredCell,
    PlacementError, ReportSink, Role, SpawnError, StoreReport, ThreadIdentity, SENTINEL,
};
pub use mwait_core::{LogSink, QueueSink, Tee};
pub use mwait_core::{DeviceHost, MutationSource, Placement, ThreadHost, WaitCapability};

// Re-export kprint macros for debug logging
pub use mwait_core::{kdebug, kerror, kinfo, kprint, kprintln, ktrace, kwarn};
pub use mwait_core::kprint::{
    init as init_logging, set_flush_enabled, set_log_level, set_thread_enabled, LogLevel,
};

// Re-export env utilities
pub use mwait_core::{env_get, env_get_bool, env_get_opt, env_get_str, env_is_set};

// Re-export runtime types
pub use mwait_runtime::{
    AutoWait, Driver, EngineConfig, FsDeviceHost, IoStatus, MonitorStats, Parts, Request,
    StdHost, UnloadReport, WorkerStats,
};

/// A loaded engine with hosted capabilities
///
/// Reports are logged at info level and queued; `reports` drains the queue.
/// Dropping the engine unloads it.
pub struct Engine {
    driver: Driver<StdHost, FsDeviceHost>,
    reports: Arc<QueueSink>,
}

impl Engine {
    /// Validate `config`, register the device and start both threads.
    pub fn load(config: EngineConfig) -> EngineResult<Self> {
        let (parts, reports) = Parts::hosted(&config);
        let driver = Driver::load(&config, parts)?;
        Ok(Self { driver, reports })
    }

    /// Drain queued reports, oldest first
    pub fn reports(&self) -> Vec<StoreReport> {
        self.reports.drain()
    }

    /// Reports lost because the queue was full
    pub fn dropped_reports(&self) -> u64 {
        self.reports.dropped()
    }

    /// Address of the watched cell
    pub fn address(&self) -> usize {
        self.driver.context().descriptor().address()
    }

    pub fn driver(&self) -> &Driver<StdHost, FsDeviceHost> {
        &self.driver
    }

    /// Stop both threads and remove the device registration.
    pub fn unload(self) -> UnloadReport {
        self.driver.unload()
    }
}
