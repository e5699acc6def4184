//! Monitor thread
//!
//! Pins itself to the monitor CPU, then repeatedly arms the wait capability
//! on the cell and sleeps until it is written. Every wakeup samples the
//! cell; a sample that differs from the previous one becomes a
//! `StoreReport`. The loop ends when a sample equals `SENTINEL`.
//!
//! # Loop
//!
//! ```text
//! previous = 0
//! loop {
//!     { suppress; start = cycles; arm_and_wait }   // guard dropped here
//!     current = cell
//!     current != previous  =>  report(previous, current, cycles - start)
//!     current == SENTINEL  =>  break
//! }
//! ```
//!
//! Arming inside the suppression scope keeps the window between the start
//! timestamp and the wait free of interrupt or signal handlers.

use std::sync::Arc;

use mwait_core::{
    kdebug, kinfo, EngineResult, MonitorDescriptor, Placement, ReportSink, Role, StoreReport,
    ThreadHost, WaitCapability, SENTINEL,
};

/// Counters returned by a finished monitor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorStats {
    /// Times the wait capability returned
    pub wakeups: u64,
    /// Wakeups whose sample differed from the previous one
    pub stores_detected: u64,
    /// Wakeups with no observable change
    pub spurious_wakeups: u64,
}

/// Capabilities shared by the worker and the monitor
pub struct Shared<W, H> {
    pub wait: Arc<W>,
    pub host: Arc<H>,
    pub placement: Arc<dyn Placement>,
    pub sink: Arc<dyn ReportSink>,
}

impl<W, H> Clone for Shared<W, H> {
    fn clone(&self) -> Self {
        Self {
            wait: Arc::clone(&self.wait),
            host: Arc::clone(&self.host),
            placement: Arc::clone(&self.placement),
            sink: Arc::clone(&self.sink),
        }
    }
}

/// Watches one cell until the sentinel shows up
pub struct Monitor<W, H> {
    descriptor: MonitorDescriptor,
    shared: Shared<W, H>,
    cpu: usize,
    worker_cpu: usize,
}

impl<W: WaitCapability, H: ThreadHost> Monitor<W, H> {
    pub fn new(
        descriptor: MonitorDescriptor,
        shared: Shared<W, H>,
        cpu: usize,
        worker_cpu: usize,
    ) -> Self {
        Self {
            descriptor,
            shared,
            cpu,
            worker_cpu,
        }
    }

    /// Pin to the monitor CPU and watch until terminated.
    ///
    /// Fails only when pinning fails; the cell is never armed in that case.
    pub fn run(&self) -> EngineResult<MonitorStats> {
        self.start()?;
        Ok(self.watch())
    }

    /// Placement half of `run`.
    pub fn start(&self) -> EngineResult<()> {
        self.shared.placement.apply(Role::Monitor, self.cpu)?;
        if let Some(current) = self.shared.placement.current_cpu() {
            debug_assert_ne!(
                current, self.worker_cpu,
                "monitor running on the worker cpu"
            );
        }

        kinfo!(
            "Monitoring address {:#x} for writes ({})",
            self.descriptor.address(),
            self.shared.wait.name()
        );
        Ok(())
    }

    /// The arm/sample loop without placement.
    pub fn watch(&self) -> MonitorStats {
        let wait = &*self.shared.wait;
        let host = &*self.shared.host;
        let mut stats = MonitorStats::default();
        let mut previous = 0;

        loop {
            let mut elapsed = 0;
            // No store can wake a cell that already holds the sentinel.
            if !self.descriptor.is_terminated() {
                let start = {
                    let _guard = wait.suppress();
                    let start = host.cycles();
                    wait.arm_and_wait(&self.descriptor);
                    start
                };
                elapsed = host.cycles().wrapping_sub(start);
                stats.wakeups += 1;
            }

            let current = self.descriptor.load();
            if current != previous {
                stats.stores_detected += 1;
                self.shared.sink.report(StoreReport {
                    address: self.descriptor.address(),
                    previous,
                    current,
                    elapsed_cycles: elapsed,
                    cpu: self.shared.placement.current_cpu(),
                });
                previous = current;
            } else {
                stats.spurious_wakeups += 1;
                kdebug!("Spurious wakeup on {:#x}", self.descriptor.address());
            }

            if current == SENTINEL {
                kinfo!(
                    "Monitor exiting: {} wakeups, {} stores, {} spurious",
                    stats.wakeups,
                    stats.stores_detected,
                    stats.spurious_wakeups
                );
                return stats;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StdHost;
    use crate::placement::NoPlacement;
    use crate::testkit::{ScriptedWait, Step};
    use mwait_core::{MonitoredCell, PlacementError, QueueSink};

    fn monitor(
        script: Vec<Step>,
    ) -> (Monitor<ScriptedWait, StdHost>, Arc<ScriptedWait>, Arc<QueueSink>) {
        let (desc, writer) = MonitoredCell::new_pair();
        let wait = Arc::new(ScriptedWait::new(writer, script));
        let sink = Arc::new(QueueSink::new(64));
        let shared = Shared {
            wait: Arc::clone(&wait),
            host: Arc::new(StdHost::new()),
            placement: Arc::new(NoPlacement),
            sink: sink.clone(),
        };
        (Monitor::new(desc, shared, 0, 2), wait, sink)
    }

    #[test]
    fn test_single_store_is_reported() {
        let (mon, _wait, sink) = monitor(vec![Step::Store(0x1234)]);
        let stats = mon.run().unwrap();

        let reports = sink.drain();
        assert_eq!(reports.len(), 2);
        assert_eq!((reports[0].previous, reports[0].current), (0, 0x1234));
        assert_eq!((reports[1].previous, reports[1].current), (0x1234, SENTINEL));
        assert_eq!(stats.stores_detected, 2);
        assert_eq!(stats.spurious_wakeups, 0);
    }

    #[test]
    fn test_reports_chain_previous_to_current() {
        let (mon, _wait, sink) =
            monitor(vec![Step::Store(1), Step::Store(2), Step::Store(3)]);
        mon.watch();

        let reports = sink.drain();
        for pair in reports.windows(2) {
            assert_eq!(pair[0].current, pair[1].previous);
        }
        for r in &reports {
            assert_ne!(r.previous, r.current);
            assert_eq!(r.address, mon.descriptor.address());
        }
        assert_eq!(reports.first().map(|r| r.previous), Some(0));
        assert_eq!(reports.last().map(|r| r.current), Some(SENTINEL));
    }

    #[test]
    fn test_spurious_wakeup_is_silent_and_rearms() {
        let (mon, wait, sink) = monitor(vec![Step::Spurious, Step::Spurious]);
        let stats = mon.watch();

        // Only the sentinel store is reported.
        let reports = sink.drain();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].current, SENTINEL);
        assert_eq!(stats.spurious_wakeups, 2);
        assert_eq!(stats.wakeups, 3);
        assert_eq!(wait.arms(), 3);
    }

    #[test]
    fn test_coalesced_stores_report_last_value() {
        let (mon, _wait, sink) = monitor(vec![Step::StoreMany(vec![1, 2, 3])]);
        mon.watch();

        let reports = sink.drain();
        assert_eq!((reports[0].previous, reports[0].current), (0, 3));
        assert_eq!(reports.len(), 2);
    }

    #[test]
    fn test_sentinel_ends_loop_without_rearming() {
        let (mon, wait, _sink) = monitor(vec![
            Step::Store(5),
            Step::Store(SENTINEL),
            Step::Store(6),
        ]);
        mon.watch();

        assert_eq!(wait.arms(), 2);
        assert_eq!(wait.remaining(), 1);
        assert!(mon.descriptor.is_terminated());
    }

    #[test]
    fn test_terminated_cell_is_sampled_without_arming() {
        let (desc, mut writer) = MonitoredCell::new_pair();
        writer.store_sentinel();
        let wait = Arc::new(ScriptedWait::detached(Vec::new()));
        let sink = Arc::new(QueueSink::new(4));
        let shared = Shared {
            wait: Arc::clone(&wait),
            host: Arc::new(StdHost::new()),
            placement: Arc::new(NoPlacement),
            sink: sink.clone(),
        };
        let stats = Monitor::new(desc, shared, 0, 2).watch();

        assert_eq!(wait.arms(), 0);
        assert_eq!(stats.wakeups, 0);
        assert_eq!(stats.stores_detected, 1);
        let reports = sink.drain();
        assert_eq!((reports[0].previous, reports[0].current), (0, SENTINEL));
    }

    #[test]
    fn test_placement_failure_skips_watch() {
        struct Refuse;
        impl Placement for Refuse {
            fn apply(&self, _role: Role, cpu: usize) -> Result<(), PlacementError> {
                Err(PlacementError::InvalidCpu(cpu))
            }
            fn current_cpu(&self) -> Option<usize> {
                None
            }
        }

        let (desc, writer) = MonitoredCell::new_pair();
        let wait = Arc::new(ScriptedWait::new(writer, vec![Step::Store(1)]));
        let shared = Shared {
            wait: Arc::clone(&wait),
            host: Arc::new(StdHost::new()),
            placement: Arc::new(Refuse),
            sink: Arc::new(QueueSink::new(4)),
        };
        let err = Monitor::new(desc, shared, 99, 2).run().unwrap_err();
        assert!(err.to_string().contains("99"));
        assert_eq!(wait.arms(), 0);
    }
}
