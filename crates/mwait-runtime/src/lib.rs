//! # mwait-runtime
//!
//! Platform-specific runtime for the MONITOR/MWAIT store-detection engine.
//!
//! This crate provides:
//! - Wait backends: privileged MONITOR/MWAIT, user-mode UMONITOR/UMWAIT,
//!   and a portable spin fallback
//! - Interrupt and signal suppression guards
//! - CPU placement via scheduler affinity
//! - Thread hosting, the unload event and device registration
//! - The worker and monitor loops and the load/unload lifecycle

pub mod arch;
pub mod config;
pub mod context;
pub mod device;
pub mod driver;
pub mod event;
pub mod host;
pub mod mask;
pub mod monitor;
pub mod mutation;
pub mod placement;
pub mod wait;
pub mod worker;

#[cfg(test)]
mod testkit;

// Re-exports
pub use config::{ConfigError, EngineConfig};
pub use context::{DeviceContext, WorkerPhase};
pub use device::{dispatch, FsDeviceHost, IoStatus, Request};
pub use driver::{Driver, Parts, UnloadReport};
pub use event::{Event, NotificationEvent};
pub use host::StdHost;
pub use mask::SignalMask;
pub use monitor::{Monitor, MonitorStats, Shared};
pub use mutation::LowByteZero;
pub use placement::{AffinityPlacement, NoPlacement};
pub use wait::{AutoWait, SpinWait};
pub use worker::{Worker, WorkerStats};

#[cfg(target_arch = "x86_64")]
pub use arch::x86_64::{Mwait, Umwait};
