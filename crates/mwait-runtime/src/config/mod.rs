//! Engine configuration
//!
//! Provides compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (runtime, via `from_env`)
//! 3. User's MW_CONFIG_RS file (compile-time)
//! 4. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use mwait_runtime::config::EngineConfig;
//!
//! let config = EngineConfig::from_env()
//!     .worker_cpu(3)
//!     .poll_interval(Duration::from_millis(10));
//! config.validate()?;
//! ```

pub mod defaults;

use std::path::PathBuf;
use std::time::Duration;

use mwait_core::env::{env_get, env_get_bool, env_get_opt, env_get_str};

/// Engine configuration with builder pattern.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// CPU the monitor thread is pinned to
    pub monitor_cpu: usize,
    /// CPU the worker thread is pinned to; must differ from `monitor_cpu`
    pub worker_cpu: usize,
    /// Sleep between worker iterations
    pub poll_interval: Duration,
    /// A write happens when `counter & write_mask == 0`
    pub write_mask: u64,
    /// Capacity of the queued report sink
    pub report_queue_capacity: usize,
    /// Longest single wait of the portable spin backend
    pub spin_budget: Duration,
    /// Pin both threads to their CPUs
    pub pin_threads: bool,
    /// Device endpoint name (the alias uses the same name)
    pub device_name: String,
    /// Directory holding the device endpoint and its alias
    pub device_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Number of CPUs usable by this process
pub fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl EngineConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `MW_MONITOR_CPU` - Monitor thread CPU
    /// - `MW_WORKER_CPU` - Worker thread CPU
    /// - `MW_POLL_INTERVAL_MS` - Worker iteration interval in milliseconds
    /// - `MW_WRITE_MASK` - Write condition mask (decimal or 0x-hex)
    /// - `MW_REPORT_QUEUE_CAPACITY` - Queued report sink capacity
    /// - `MW_SPIN_WAIT_BUDGET_US` - Spin backend wait budget in microseconds
    /// - `MW_PIN_THREADS` - Pin threads to CPUs (0/1)
    /// - `MW_DEVICE_NAME` - Device endpoint name
    /// - `MW_DEVICE_DIR` - Device endpoint directory
    pub fn from_env() -> Self {
        let base = Self::new();
        Self {
            monitor_cpu: env_get("MW_MONITOR_CPU", base.monitor_cpu),
            worker_cpu: env_get("MW_WORKER_CPU", base.worker_cpu),
            poll_interval: Duration::from_millis(env_get(
                "MW_POLL_INTERVAL_MS",
                defaults::POLL_INTERVAL_MS,
            )),
            write_mask: env_get("MW_WRITE_MASK", base.write_mask),
            report_queue_capacity: env_get(
                "MW_REPORT_QUEUE_CAPACITY",
                base.report_queue_capacity,
            ),
            spin_budget: Duration::from_micros(env_get(
                "MW_SPIN_WAIT_BUDGET_US",
                defaults::SPIN_WAIT_BUDGET_US,
            )),
            pin_threads: env_get_bool("MW_PIN_THREADS", base.pin_threads),
            device_name: env_get_str("MW_DEVICE_NAME", &base.device_name),
            device_dir: env_get_opt::<String>("MW_DEVICE_DIR")
                .map(PathBuf::from)
                .unwrap_or(base.device_dir),
        }
    }

    /// Create config with compile-time defaults only (no env override).
    ///
    /// The worker CPU is clamped to the highest CPU this process can use.
    pub fn new() -> Self {
        let last_cpu = available_cpus().saturating_sub(1);
        Self {
            monitor_cpu: defaults::MONITOR_CPU,
            worker_cpu: defaults::WORKER_CPU.min(last_cpu),
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            write_mask: defaults::WRITE_MASK,
            report_queue_capacity: defaults::REPORT_QUEUE_CAPACITY,
            spin_budget: Duration::from_micros(defaults::SPIN_WAIT_BUDGET_US),
            pin_threads: defaults::PIN_THREADS,
            device_name: defaults::DEVICE_NAME.to_string(),
            device_dir: std::env::temp_dir(),
        }
    }

    // Builder methods

    pub fn monitor_cpu(mut self, cpu: usize) -> Self {
        self.monitor_cpu = cpu;
        self
    }

    pub fn worker_cpu(mut self, cpu: usize) -> Self {
        self.worker_cpu = cpu;
        self
    }

    pub fn poll_interval(mut self, d: Duration) -> Self {
        self.poll_interval = d;
        self
    }

    pub fn write_mask(mut self, mask: u64) -> Self {
        self.write_mask = mask;
        self
    }

    pub fn report_queue_capacity(mut self, cap: usize) -> Self {
        self.report_queue_capacity = cap;
        self
    }

    pub fn spin_budget(mut self, d: Duration) -> Self {
        self.spin_budget = d;
        self
    }

    pub fn pin_threads(mut self, enable: bool) -> Self {
        self.pin_threads = enable;
        self
    }

    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    pub fn device_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.device_dir = dir.into();
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pin_threads && self.monitor_cpu == self.worker_cpu {
            return Err(ConfigError::InvalidValue(
                "monitor_cpu and worker_cpu must differ",
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue("poll_interval must be > 0"));
        }
        if self.report_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue("report_queue_capacity must be > 0"));
        }
        if self.spin_budget.is_zero() {
            return Err(ConfigError::InvalidValue("spin_budget must be > 0"));
        }
        if self.device_name.is_empty() || self.device_name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue(
                "device_name must be a non-empty single path component",
            ));
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        eprintln!("Mwait Configuration:");
        eprintln!("  monitor_cpu:            {}", self.monitor_cpu);
        eprintln!("  worker_cpu:             {}", self.worker_cpu);
        eprintln!("  poll_interval:          {:?}", self.poll_interval);
        eprintln!("  write_mask:             {:#x}", self.write_mask);
        eprintln!("  report_queue_capacity:  {}", self.report_queue_capacity);
        eprintln!("  spin_budget:            {:?}", self.spin_budget);
        eprintln!("  pin_threads:            {}", self.pin_threads);
        eprintln!("  device_name:            {}", self.device_name);
        eprintln!("  device_dir:             {}", self.device_dir.display());
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for mwait_core::EngineError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidValue(msg) => mwait_core::EngineError::Config(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::new();
        assert_eq!(config.monitor_cpu, defaults::MONITOR_CPU);
        assert!(config.worker_cpu < available_cpus());
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.write_mask, 0xff);
        assert_eq!(config.device_name, "Mwait");
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .monitor_cpu(1)
            .worker_cpu(3)
            .poll_interval(Duration::from_millis(5))
            .pin_threads(false);

        assert_eq!(config.monitor_cpu, 1);
        assert_eq!(config.worker_cpu, 3);
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert!(!config.pin_threads);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = EngineConfig::new().monitor_cpu(2).worker_cpu(2);
        assert!(config.validate().is_err());

        // Shared CPU is fine when nothing is pinned
        let config = config.pin_threads(false);
        assert!(config.validate().is_ok());

        let config = EngineConfig::new().pin_threads(false).poll_interval(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = EngineConfig::new().pin_threads(false).device_name("a/b");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("MW_WRITE_MASK", "0x0f");
        std::env::set_var("MW_POLL_INTERVAL_MS", "7");
        let config = EngineConfig::from_env();
        std::env::remove_var("MW_WRITE_MASK");
        std::env::remove_var("MW_POLL_INTERVAL_MS");

        assert_eq!(config.write_mask, 0x0f);
        assert_eq!(config.poll_interval, Duration::from_millis(7));
    }

    #[test]
    fn test_config_error_converts() {
        let err: mwait_core::EngineError = ConfigError::InvalidValue("x").into();
        assert_eq!(err, mwait_core::EngineError::Config("x"));
    }
}
