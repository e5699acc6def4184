//! # mwait-core
//!
//! Core types and traits for the MONITOR/MWAIT store-detection engine.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! All platform-specific implementations are in `mwait-runtime`.
//!
//! ## Modules
//!
//! - `cell` - The monitored cell, its single writer and the monitor descriptor
//! - `id` - Thread identity and thread role types
//! - `report` - Detected-store reports and report sinks
//! - `traits` - Capability traits (wait, placement, threads, mutation, devices)
//! - `error` - Error types
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod cell;
pub mod id;
pub mod report;
pub mod traits;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use cell::{CellWriter, MonitorDescriptor, MonitoredCell, SENTINEL};
pub use id::{Role, ThreadIdentity};
pub use report::{LogSink, QueueSink, ReportSink, StoreReport, Tee};
pub use traits::{
    AliasHandle, DeviceHandle, DeviceHost, MutationSource, Placement, ThreadHost, WaitCapability,
};
pub use error::{DeviceError, EngineError, EngineResult, PlacementError, SpawnError};
pub use env::{env_get, env_get_bool, env_get_opt, env_get_str, env_is_set};

/// Constants for the watch target layout
pub mod constants {
    /// Cache line size; MONITOR arms a whole line
    pub const CACHE_LINE_SIZE: usize = 64;

    /// Default mask for the counter-derived write condition (1-in-256)
    pub const DEFAULT_WRITE_MASK: u64 = 0xff;
}
