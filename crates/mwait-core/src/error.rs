//! Error types for the store-detection engine

use core::fmt;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by load, thread startup and placement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Thread creation failed
    Spawn(SpawnError),

    /// Pinning a thread to its CPU failed
    Placement(PlacementError),

    /// Host device registration failed
    Device(DeviceError),

    /// Configuration rejected
    Config(&'static str),

    /// Capability not available on this platform or CPU
    Unsupported(&'static str),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Spawn(e) => write!(f, "spawn error: {}", e),
            EngineError::Placement(e) => write!(f, "placement error: {}", e),
            EngineError::Device(e) => write!(f, "device error: {}", e),
            EngineError::Config(msg) => write!(f, "invalid config: {}", msg),
            EngineError::Unsupported(what) => write!(f, "unsupported: {}", what),
        }
    }
}

impl std::error::Error for EngineError {}

/// Thread creation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// The host refused to create the thread
    Refused(&'static str),

    /// OS error with errno
    Os(i32),
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::Refused(name) => write!(f, "unable to create thread {}", name),
            SpawnError::Os(errno) => write!(f, "unable to create thread: errno {}", errno),
        }
    }
}

impl From<SpawnError> for EngineError {
    fn from(e: SpawnError) -> Self {
        EngineError::Spawn(e)
    }
}

/// CPU placement errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// Requested CPU does not exist or is not usable by this process
    InvalidCpu(usize),

    /// Placement not supported on this platform
    Unsupported,

    /// OS error with errno
    Os(i32),
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::InvalidCpu(cpu) => write!(f, "invalid cpu {}", cpu),
            PlacementError::Unsupported => write!(f, "affinity not supported"),
            PlacementError::Os(errno) => write!(f, "set affinity: errno {}", errno),
        }
    }
}

impl From<PlacementError> for EngineError {
    fn from(e: PlacementError) -> Self {
        EngineError::Placement(e)
    }
}

/// Host device registration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Name is already registered
    Exists(String),

    /// Name is not usable as an endpoint
    InvalidName(String),

    /// OS error with errno
    Os(i32),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Exists(name) => write!(f, "{} already exists", name),
            DeviceError::InvalidName(name) => write!(f, "invalid device name {:?}", name),
            DeviceError::Os(errno) => write!(f, "errno {}", errno),
        }
    }
}

impl From<DeviceError> for EngineError {
    fn from(e: DeviceError) -> Self {
        EngineError::Device(e)
    }
}
