//! Portable wait backend and backend selection

use std::thread;
use std::time::{Duration, Instant};

use mwait_core::{MonitorDescriptor, WaitCapability};

use crate::mask::SignalMask;

/// Spins checked between deadline reads
const SPINS_PER_CHECK: u32 = 256;

/// Software model of arm-and-wait
///
/// Arming snapshots the target; the wait ends when the value differs from
/// the snapshot or when the budget runs out. A budget expiry is the spin
/// backend's spurious wakeup. Like the hardware, a store that lands before
/// arming is not seen by this wait.
#[derive(Debug, Clone)]
pub struct SpinWait {
    budget: Duration,
}

impl SpinWait {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

impl WaitCapability for SpinWait {
    type Guard = SignalMask;

    fn suppress(&self) -> SignalMask {
        SignalMask::block_all()
    }

    fn arm_and_wait(&self, target: &MonitorDescriptor) {
        let armed = target.load();
        let deadline = Instant::now() + self.budget;
        let mut spins = 0u32;

        while target.load() == armed {
            spins = spins.wrapping_add(1);
            if spins % SPINS_PER_CHECK == 0 {
                if Instant::now() >= deadline {
                    return;
                }
                thread::yield_now();
            } else {
                core::hint::spin_loop();
            }
        }
    }

    fn name(&self) -> &'static str {
        "spin"
    }
}

/// Best available user-mode backend
pub enum AutoWait {
    #[cfg(target_arch = "x86_64")]
    Umwait(crate::arch::x86_64::Umwait),
    Spin(SpinWait),
}

impl AutoWait {
    /// UMWAIT when the CPU has WAITPKG, otherwise spinning.
    ///
    /// `budget` bounds a single wait in either case. The UMWAIT deadline is
    /// expressed in TSC ticks at one tick per nanosecond, which never
    /// exceeds the budget on a TSC of 1 GHz or faster.
    pub fn detect(budget: Duration) -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            let ticks = u64::try_from(budget.as_nanos()).unwrap_or(u64::MAX);
            if let Ok(umwait) = crate::arch::x86_64::Umwait::new(ticks) {
                return AutoWait::Umwait(umwait);
            }
        }
        AutoWait::Spin(SpinWait::new(budget))
    }
}

impl WaitCapability for AutoWait {
    type Guard = SignalMask;

    fn suppress(&self) -> SignalMask {
        SignalMask::block_all()
    }

    fn arm_and_wait(&self, target: &MonitorDescriptor) {
        match self {
            #[cfg(target_arch = "x86_64")]
            AutoWait::Umwait(w) => w.arm_and_wait(target),
            AutoWait::Spin(w) => w.arm_and_wait(target),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            #[cfg(target_arch = "x86_64")]
            AutoWait::Umwait(w) => w.name(),
            AutoWait::Spin(w) => w.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mwait_core::MonitoredCell;

    #[test]
    fn test_spin_wait_expires_without_store() {
        let (desc, _writer) = MonitoredCell::new_pair();
        let wait = SpinWait::new(Duration::from_millis(5));

        let start = Instant::now();
        {
            let _guard = wait.suppress();
            wait.arm_and_wait(&desc);
        }
        assert!(start.elapsed() >= Duration::from_millis(5));
        assert_eq!(desc.load(), 0);
    }

    #[test]
    fn test_spin_wait_wakes_on_store() {
        let (desc, mut writer) = MonitoredCell::new_pair();
        let wait = SpinWait::new(Duration::from_secs(10));

        let storer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.store(0x1234);
        });

        let start = Instant::now();
        wait.arm_and_wait(&desc);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(desc.load(), 0x1234);
        storer.join().unwrap();
    }

    #[test]
    fn test_detect_names_a_backend() {
        let wait = AutoWait::detect(Duration::from_millis(1));
        assert!(matches!(wait.name(), "umwait" | "spin"));
        if !crate::arch::cpu_supports_waitpkg() {
            assert_eq!(wait.name(), "spin");
        }
    }
}
