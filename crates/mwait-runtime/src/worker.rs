//! Worker thread
//!
//! The worker owns the cell's writer. It pins itself, starts the monitor
//! and waits for the monitor to pin itself. Then it loops until the unload
//! event is set:
//!
//! 1. Poll the unload event with a zero timeout
//! 2. Ask the mutation source for a value and store it
//! 3. Sleep for the poll interval
//!
//! On unload it stores `SENTINEL`, which is what ends the monitor, and
//! joins the monitor before returning.

use std::sync::Arc;
use std::time::Duration;

use mwait_core::{
    kdebug, kerror, kinfo, kwarn, CellWriter, MutationSource, Role, ThreadHost, WaitCapability,
    SENTINEL,
};

use crate::config::EngineConfig;
use crate::context::{DeviceContext, WorkerPhase};
use crate::monitor::{Monitor, Shared};

/// Counters returned by a finished worker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Loop iterations completed before unload
    pub iterations: u64,
    /// Values stored into the cell, excluding the sentinel
    pub writes: u64,
    /// Whether the monitor thread was resolved and waited for
    pub monitor_joined: bool,
}

/// Reports a failed monitor start unless a result was already reported,
/// including when the monitor thread unwinds.
struct PendingStart<'a>(&'a DeviceContext);

impl Drop for PendingStart<'_> {
    fn drop(&mut self) {
        self.0.report_monitor_start(false);
    }
}

/// Worker half of a loaded engine
pub struct Worker<W, H> {
    ctx: Arc<DeviceContext>,
    writer: CellWriter,
    mutation: Box<dyn MutationSource>,
    shared: Shared<W, H>,
    cpu: usize,
    monitor_cpu: usize,
    poll_interval: Duration,
}

impl<W: WaitCapability, H: ThreadHost> Worker<W, H> {
    pub fn new(
        ctx: Arc<DeviceContext>,
        writer: CellWriter,
        mutation: Box<dyn MutationSource>,
        shared: Shared<W, H>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            ctx,
            writer,
            mutation,
            shared,
            cpu: config.worker_cpu,
            monitor_cpu: config.monitor_cpu,
            poll_interval: config.poll_interval,
        }
    }

    /// Run to completion. Stats are also recorded in the device context.
    pub fn run(mut self) -> WorkerStats {
        let stats = self.execute();
        self.ctx.record_worker_stats(stats.clone());
        stats
    }

    fn execute(&mut self) -> WorkerStats {
        let mut stats = WorkerStats::default();
        self.ctx.set_phase(WorkerPhase::Starting);

        if let Err(e) = self.shared.placement.apply(Role::Worker, self.cpu) {
            kerror!("Unable to pin worker to cpu {}: {}", self.cpu, e);
            self.ctx.set_phase(WorkerPhase::Failed);
            return stats;
        }

        let monitor = Monitor::new(
            self.ctx.descriptor().clone(),
            self.shared.clone(),
            self.monitor_cpu,
            self.cpu,
        );
        let ctx = Arc::clone(&self.ctx);
        let spawned = self.shared.host.spawn(Role::Monitor.thread_name(), move || {
            let _pending = PendingStart(&ctx);
            match monitor.start() {
                Ok(()) => {
                    ctx.report_monitor_start(true);
                    ctx.record_monitor_stats(monitor.watch());
                }
                Err(e) => kerror!("Monitor failed to start: {}", e),
            }
        });
        let monitor_id = match spawned {
            Ok(id) => id,
            Err(e) => {
                kerror!("{}", e);
                self.ctx.set_phase(WorkerPhase::Failed);
                return stats;
            }
        };
        self.ctx.set_monitor_identity(monitor_id);

        if !self.ctx.await_monitor_start() {
            kerror!("Monitor did not start; worker not running");
            stats.monitor_joined = self.shared.host.join(monitor_id);
            self.ctx.set_phase(WorkerPhase::Failed);
            return stats;
        }
        self.ctx.set_phase(WorkerPhase::Running);
        kinfo!(
            "Worker running on cpu {}, writing {:#x}",
            self.cpu,
            self.writer.address()
        );

        while !self.ctx.unload_requested() {
            let tick = self.shared.host.cycles();
            if let Some(value) = self.mutation.next(tick) {
                if value == SENTINEL {
                    kwarn!("Skipping reserved value {:#x}", value);
                } else {
                    self.writer.store(value);
                    stats.writes += 1;
                    kdebug!("Wrote {:#x}", value);
                }
            }
            stats.iterations += 1;
            self.shared.host.sleep(self.poll_interval);
        }

        self.ctx.set_phase(WorkerPhase::ShuttingDown);
        self.writer.store_sentinel();

        stats.monitor_joined = self.shared.host.join(monitor_id);
        if stats.monitor_joined {
            kinfo!("Monitor thread exited");
        } else {
            kwarn!("Unable to resolve monitor thread {}; not waiting", monitor_id);
        }
        self.ctx.set_phase(WorkerPhase::Joined);
        kinfo!(
            "Worker exiting: {} iterations, {} writes",
            stats.iterations,
            stats.writes
        );
        stats
    }
}
