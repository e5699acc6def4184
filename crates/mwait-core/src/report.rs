//! Detected-store reports
//!
//! The monitor emits one `StoreReport` each time two consecutive samples
//! of the cell differ. Reports go through a `ReportSink`; sinks are a
//! one-way, best-effort channel and must never block the monitor.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_queue::ArrayQueue;

/// A change observed between two consecutive samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreReport {
    /// Address of the watched word
    pub address: usize,
    /// Previous sample
    pub previous: u64,
    /// New sample
    pub current: u64,
    /// Cycles elapsed since the watch was armed
    pub elapsed_cycles: u64,
    /// CPU the monitor observed the change on
    pub cpu: Option<usize>,
}

impl fmt::Display for StoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cpu {
            Some(cpu) => write!(f, "[{:x}] ", cpu)?,
            None => write!(f, "[-] ")?,
        }
        write!(
            f,
            "Store detected on {:#x}: {:#x} != {:#x} | delta: {}",
            self.address, self.previous, self.current, self.elapsed_cycles
        )
    }
}

/// Destination for detected-store reports
pub trait ReportSink: Send + Sync {
    /// Accept a report. Must not block.
    fn report(&self, report: StoreReport);
}

/// Sink that writes reports to the diagnostic log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn report(&self, report: StoreReport) {
        crate::kinfo!("{}", report);
    }
}

/// Bounded lock-free sink
///
/// Reports that do not fit are dropped and counted.
pub struct QueueSink {
    queue: ArrayQueue<StoreReport>,
    dropped: AtomicU64,
}

impl QueueSink {
    /// Create a sink holding at most `capacity` undrained reports
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Take every queued report, oldest first
    pub fn drain(&self) -> Vec<StoreReport> {
        let mut out = Vec::with_capacity(self.queue.len());
        while let Some(report) = self.queue.pop() {
            out.push(report);
        }
        out
    }

    /// Number of reports waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if no reports are waiting
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Reports lost because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ReportSink for QueueSink {
    fn report(&self, report: StoreReport) {
        if self.queue.push(report).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Forward every report to two sinks
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A, B> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: ReportSink, B: ReportSink> ReportSink for Tee<A, B> {
    fn report(&self, report: StoreReport) {
        self.first.report(report);
        self.second.report(report);
    }
}

impl<S: ReportSink + ?Sized> ReportSink for std::sync::Arc<S> {
    fn report(&self, report: StoreReport) {
        (**self).report(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample(previous: u64, current: u64) -> StoreReport {
        StoreReport {
            address: 0x1000,
            previous,
            current,
            elapsed_cycles: 42,
            cpu: Some(1),
        }
    }

    #[test]
    fn test_report_display() {
        let text = sample(0, 0x1234).to_string();
        assert_eq!(text, "[1] Store detected on 0x1000: 0x0 != 0x1234 | delta: 42");

        let mut r = sample(1, 2);
        r.cpu = None;
        assert!(r.to_string().starts_with("[-] "));
    }

    #[test]
    fn test_queue_sink_drains_in_order() {
        let sink = QueueSink::new(8);
        sink.report(sample(0, 1));
        sink.report(sample(1, 2));
        assert_eq!(sink.len(), 2);

        let drained = sink.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].current, 1);
        assert_eq!(drained[1].current, 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_queue_sink_drops_when_full() {
        let sink = QueueSink::new(2);
        for i in 0..5 {
            sink.report(sample(i, i + 1));
        }
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.dropped(), 3);
    }

    #[test]
    fn test_tee_forwards_to_both() {
        let a = Arc::new(QueueSink::new(4));
        let b = Arc::new(QueueSink::new(4));
        let tee = Tee::new(Arc::clone(&a), Arc::clone(&b));
        tee.report(sample(3, 4));
        assert_eq!(a.drain(), vec![sample(3, 4)]);
        assert_eq!(b.drain(), vec![sample(3, 4)]);
    }
}
