//! Engine lifecycle
//!
//! `Driver::load` registers the device endpoint and its alias, creates the
//! monitored cell and starts the worker (which starts the monitor).
//! `Driver::unload` signals the worker, waits for it and tears the
//! registration down in reverse order.
//!
//! A load that fails partway undoes whatever it had registered, so a
//! failed load leaves nothing behind.

use std::sync::Arc;

use mwait_core::{
    kerror, kinfo, kwarn, AliasHandle, DeviceHandle, DeviceHost, EngineResult, LogSink,
    MonitoredCell, MutationSource, Placement, QueueSink, ReportSink, Role, Tee, ThreadHost,
    WaitCapability,
};

use crate::config::EngineConfig;
use crate::context::DeviceContext;
use crate::device::{self, FsDeviceHost, IoStatus, Request};
use crate::host::StdHost;
use crate::monitor::{MonitorStats, Shared};
use crate::mutation::LowByteZero;
use crate::placement::{AffinityPlacement, NoPlacement};
use crate::wait::AutoWait;
use crate::worker::{Worker, WorkerStats};

/// Everything `load` needs besides configuration
pub struct Parts<W, H, D> {
    pub wait: W,
    pub host: H,
    pub devices: D,
    pub placement: Arc<dyn Placement>,
    pub sink: Arc<dyn ReportSink>,
    pub mutation: Box<dyn MutationSource>,
}

impl Parts<AutoWait, StdHost, FsDeviceHost> {
    /// Hosted capabilities: best available wait backend, `std` threads,
    /// filesystem device registration, affinity pinning when enabled.
    ///
    /// Reports are logged and also queued on the returned `QueueSink`.
    pub fn hosted(config: &EngineConfig) -> (Self, Arc<QueueSink>) {
        let queue = Arc::new(QueueSink::new(config.report_queue_capacity));
        let placement: Arc<dyn Placement> = if config.pin_threads {
            Arc::new(AffinityPlacement::new())
        } else {
            Arc::new(NoPlacement)
        };
        let parts = Parts {
            wait: AutoWait::detect(config.spin_budget),
            host: StdHost::new(),
            devices: FsDeviceHost::new(&config.device_dir),
            placement,
            sink: Arc::new(Tee::new(LogSink, Arc::clone(&queue))),
            mutation: Box::new(LowByteZero::new(config.write_mask)),
        };
        (parts, queue)
    }
}

/// Outcome of an unload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnloadReport {
    /// Whether the worker thread was resolved and waited for
    pub worker_joined: bool,
    pub worker: Option<WorkerStats>,
    pub monitor: Option<MonitorStats>,
    /// Cell contents after both threads stopped
    pub final_value: u64,
}

/// A loaded engine
pub struct Driver<H: ThreadHost, D: DeviceHost> {
    ctx: Arc<DeviceContext>,
    host: Arc<H>,
    devices: D,
    device: Option<DeviceHandle>,
    alias: Option<AliasHandle>,
}

impl<H: ThreadHost, D: DeviceHost> Driver<H, D> {
    /// Register the device and start the worker.
    pub fn load<W: WaitCapability>(config: &EngineConfig, parts: Parts<W, H, D>) -> EngineResult<Self> {
        config.validate()?;
        let Parts {
            wait,
            host,
            devices,
            placement,
            sink,
            mutation,
        } = parts;

        let device = devices.create_device(&config.device_name).map_err(|e| {
            kerror!("Unable to create device {}: {}", config.device_name, e);
            e
        })?;
        let alias = match devices.create_alias(&config.device_name, &device) {
            Ok(alias) => alias,
            Err(e) => {
                kerror!("Unable to create alias {}: {}", config.device_name, e);
                devices.delete_device(device);
                return Err(e.into());
            }
        };

        let (descriptor, writer) = MonitoredCell::new_pair();
        let ctx = Arc::new(DeviceContext::new(descriptor, device.clone()));
        let host = Arc::new(host);
        let shared = Shared {
            wait: Arc::new(wait),
            host: Arc::clone(&host),
            placement,
            sink,
        };
        let worker = Worker::new(Arc::clone(&ctx), writer, mutation, shared, config);

        match host.spawn(Role::Worker.thread_name(), move || {
            worker.run();
        }) {
            Ok(id) => ctx.set_worker_identity(id),
            Err(e) => {
                kerror!("{}", e);
                devices.delete_alias(alias);
                devices.delete_device(device);
                return Err(e);
            }
        }

        kinfo!(
            "Loaded {} ({}), cell at {:#x}",
            device.name,
            device.location.display(),
            ctx.descriptor().address()
        );
        Ok(Self {
            ctx,
            host,
            devices,
            device: Some(device),
            alias: Some(alias),
        })
    }

    /// Stop both threads and remove the registration.
    pub fn unload(mut self) -> UnloadReport {
        self.shutdown()
    }

    /// Handle a create or close request on the device endpoint.
    pub fn dispatch(&self, request: Request) -> IoStatus {
        device::dispatch(request)
    }

    pub fn context(&self) -> &Arc<DeviceContext> {
        &self.ctx
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn device(&self) -> Option<&DeviceHandle> {
        self.device.as_ref()
    }

    pub fn alias(&self) -> Option<&AliasHandle> {
        self.alias.as_ref()
    }

    fn is_loaded(&self) -> bool {
        self.device.is_some()
    }

    fn shutdown(&mut self) -> UnloadReport {
        let ctx = &self.ctx;
        if self.is_loaded() {
            ctx.signal_unload();
        }

        let worker_joined = match ctx.worker_identity() {
            Some(id) if self.is_loaded() => self.host.join(id),
            _ => false,
        };
        if worker_joined {
            kinfo!("Worker thread exited");
        } else if self.is_loaded() {
            kwarn!("Unable to resolve worker thread; not waiting");
        }

        if let Some(alias) = self.alias.take() {
            self.devices.delete_alias(alias);
        }
        if let Some(device) = self.device.take() {
            kinfo!("Bye from {}", device.name);
            self.devices.delete_device(device);
        }

        UnloadReport {
            worker_joined,
            worker: ctx.worker_stats(),
            monitor: ctx.monitor_stats(),
            final_value: ctx.descriptor().load(),
        }
    }
}

impl<H: ThreadHost, D: DeviceHost> Drop for Driver<H, D> {
    fn drop(&mut self) {
        if self.is_loaded() {
            self.shutdown();
        }
    }
}
