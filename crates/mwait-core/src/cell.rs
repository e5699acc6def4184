//! The monitored cell
//!
//! A single 64-bit word that the monitor thread arms a hardware watch on.
//! The word sits alone on its cache line so that bookkeeping stores never
//! wake the watcher.
//!
//! Ownership is split by capability:
//! - `CellWriter` is the only handle able to store into the cell. Exactly one
//!   exists per cell and it is not `Clone`.
//! - `MonitorDescriptor` is a read-only handle carrying the target address.
//!   It keeps the allocation alive, so the address stays valid for as long
//!   as anything can arm a watch on it.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Reserved value whose appearance in the cell terminates the monitor loop.
///
/// The worker's mutation traffic is a cycle counter; this bit pattern is
/// far outside any value a counter reaches in practice.
pub const SENTINEL: u64 = 0xEEFF_EEFF_EEFF_EEFF;

#[repr(C, align(64))]
struct Line {
    value: AtomicU64,
}

/// Heap-allocated, cache-line aligned watch target
#[repr(C)]
pub struct MonitoredCell {
    line: Line,
    /// Store counter, kept on the next cache line
    stores: AtomicU64,
}

impl MonitoredCell {
    /// Allocate a zeroed cell and split it into its writer and descriptor.
    pub fn new_pair() -> (MonitorDescriptor, CellWriter) {
        let cell = Arc::new(MonitoredCell {
            line: Line { value: AtomicU64::new(0) },
            stores: AtomicU64::new(0),
        });
        (
            MonitorDescriptor { cell: Arc::clone(&cell) },
            CellWriter { cell },
        )
    }

    #[inline]
    fn load(&self) -> u64 {
        self.line.value.load(Ordering::Acquire)
    }

    #[inline]
    fn address(&self) -> usize {
        &self.line.value as *const AtomicU64 as usize
    }
}

/// The single write capability for a monitored cell
pub struct CellWriter {
    cell: Arc<MonitoredCell>,
}

impl CellWriter {
    /// Store a value into the cell
    #[inline]
    pub fn store(&mut self, value: u64) {
        self.cell.line.value.store(value, Ordering::Release);
        self.cell.stores.fetch_add(1, Ordering::Relaxed);
    }

    /// Store the termination sentinel
    #[inline]
    pub fn store_sentinel(&mut self) {
        self.store(SENTINEL);
    }

    /// Current value (the writer may read its own cell)
    #[inline]
    pub fn load(&self) -> u64 {
        self.cell.load()
    }

    /// Address of the watched word
    #[inline]
    pub fn address(&self) -> usize {
        self.cell.address()
    }
}

impl fmt::Debug for CellWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellWriter({:#x})", self.address())
    }
}

/// Read-only view of the monitored cell handed to the monitor thread
#[derive(Clone)]
pub struct MonitorDescriptor {
    cell: Arc<MonitoredCell>,
}

impl MonitorDescriptor {
    /// Address of the watched word
    #[inline]
    pub fn address(&self) -> usize {
        self.cell.address()
    }

    /// Raw pointer to the watched word, for arming hardware monitors
    #[inline]
    pub fn as_ptr(&self) -> *const u64 {
        self.cell.line.value.as_ptr() as *const u64
    }

    /// Sample the current value
    #[inline]
    pub fn load(&self) -> u64 {
        self.cell.load()
    }

    /// Number of stores performed through the writer so far
    #[inline]
    pub fn stores(&self) -> u64 {
        self.cell.stores.load(Ordering::Relaxed)
    }

    /// Whether the cell currently holds the sentinel
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.load() == SENTINEL
    }
}

impl fmt::Debug for MonitorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MonitorDescriptor({:#x})", self.address())
    }
}
