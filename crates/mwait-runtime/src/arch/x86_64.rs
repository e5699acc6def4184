//! x86_64 MONITOR/MWAIT and UMONITOR/UMWAIT
//!
//! Two hardware backends for `WaitCapability`:
//!
//! - `Mwait`: MONITOR + MWAIT. Both instructions fault outside CPL0 on
//!   current parts, so this backend is only usable when the engine is
//!   embedded in kernel-mode code. Asynchronous events are suppressed by
//!   clearing IF.
//! - `Umwait`: UMONITOR + UMWAIT (WAITPKG). Usable from user mode. Each wait
//!   carries a TSC deadline, and the OS may cap it further, so a wait can
//!   never outlive its deadline. Asynchronous events are suppressed by
//!   masking signals on the calling thread.
//!
//! MONITOR performs the same segmentation and paging checks as a one-byte
//! read of the target. The target must be mapped for as long as the watch
//! can be armed; `MonitorDescriptor` owns the allocation, which guarantees
//! this for every caller.

use core::arch::asm;
use core::arch::x86_64::{__cpuid, __cpuid_count, _rdtsc};
use core::marker::PhantomData;

use mwait_core::{EngineError, EngineResult, MonitorDescriptor, WaitCapability};

use crate::mask::SignalMask;

const CPUID_1_ECX_MONITOR: u32 = 1 << 3;
const CPUID_7_ECX_WAITPKG: u32 = 1 << 5;
const RFLAGS_IF: u64 = 1 << 9;

/// Read the time-stamp counter
#[inline]
pub fn cycles() -> u64 {
    unsafe { _rdtsc() }
}

/// CPUID.01H:ECX.MONITOR[bit 3]
pub fn cpu_supports_monitor() -> bool {
    let leaf1 = __cpuid(1);
    leaf1.ecx & CPUID_1_ECX_MONITOR != 0
}

/// CPUID.(EAX=07H,ECX=0):ECX.WAITPKG[bit 5]
pub fn cpu_supports_waitpkg() -> bool {
    let max_leaf = __cpuid(0).eax;
    if max_leaf < 7 {
        return false;
    }
    let leaf7 = __cpuid_count(7, 0);
    leaf7.ecx & CPUID_7_ECX_WAITPKG != 0
}

#[inline]
fn interrupts_enabled() -> bool {
    let flags: u64;
    // SAFETY: reading RFLAGS has no side effects.
    unsafe {
        asm!("pushfq", "pop {}", out(reg) flags, options(nomem, preserves_flags));
    }
    flags & RFLAGS_IF != 0
}

/// Clears IF on creation and restores the previous IF state on drop.
///
/// Bound to the CPU that created it, so it is neither `Send` nor `Sync`.
pub struct InterruptGuard {
    were_enabled: bool,
    _not_send: PhantomData<*const ()>,
}

impl InterruptGuard {
    /// # Safety
    ///
    /// The caller must be executing at CPL0.
    #[inline]
    pub unsafe fn new() -> Self {
        let were_enabled = interrupts_enabled();
        if were_enabled {
            asm!("cli", options(nostack));
        }
        Self {
            were_enabled,
            _not_send: PhantomData,
        }
    }
}

impl Drop for InterruptGuard {
    #[inline]
    fn drop(&mut self) {
        if self.were_enabled {
            // SAFETY: constructed at CPL0 (see `new`).
            unsafe { asm!("sti", options(nostack)) };
        }
    }
}

/// MONITOR/MWAIT backend (kernel mode only)
#[derive(Debug)]
pub struct Mwait {
    _private: (),
}

impl Mwait {
    /// # Safety
    ///
    /// Every thread that calls `suppress` or `arm_and_wait` on the returned
    /// value must execute at CPL0.
    pub unsafe fn new() -> EngineResult<Self> {
        if !cpu_supports_monitor() {
            return Err(EngineError::Unsupported("MONITOR/MWAIT"));
        }
        Ok(Self { _private: () })
    }
}

impl WaitCapability for Mwait {
    type Guard = InterruptGuard;

    fn suppress(&self) -> InterruptGuard {
        // SAFETY: `Mwait` can only be constructed by a CPL0 caller.
        unsafe { InterruptGuard::new() }
    }

    fn arm_and_wait(&self, target: &MonitorDescriptor) {
        let addr = target.as_ptr();
        // SAFETY: the descriptor keeps the target mapped; CPL0 per `new`.
        unsafe {
            asm!(
                "monitor",
                in("rax") addr,
                in("ecx") 0u32,
                in("edx") 0u32,
                options(nostack, preserves_flags),
            );
            asm!(
                "mwait",
                in("eax") 0u32,
                in("ecx") 0u32,
                options(nostack, preserves_flags),
            );
        }
    }

    fn name(&self) -> &'static str {
        "mwait"
    }
}

/// UMONITOR/UMWAIT backend (user mode, WAITPKG)
#[derive(Debug)]
pub struct Umwait {
    budget_cycles: u64,
}

impl Umwait {
    /// Use UMWAIT with each wait bounded by `budget_cycles` TSC ticks.
    pub fn new(budget_cycles: u64) -> EngineResult<Self> {
        if !cpu_supports_waitpkg() {
            return Err(EngineError::Unsupported("WAITPKG"));
        }
        Ok(Self {
            budget_cycles: budget_cycles.max(1),
        })
    }

    pub fn budget_cycles(&self) -> u64 {
        self.budget_cycles
    }
}

impl WaitCapability for Umwait {
    type Guard = SignalMask;

    fn suppress(&self) -> SignalMask {
        SignalMask::block_all()
    }

    fn arm_and_wait(&self, target: &MonitorDescriptor) {
        let addr = target.as_ptr();
        let deadline = cycles().wrapping_add(self.budget_cycles);
        // SAFETY: WAITPKG was probed in `new`; the descriptor keeps the
        // target mapped. Control word 0 selects the C0.2 state.
        unsafe {
            asm!(
                "umonitor {addr}",
                addr = in(reg) addr,
                options(nostack, preserves_flags),
            );
            asm!(
                "umwait {ctl:e}",
                ctl = in(reg) 0u32,
                in("eax") deadline as u32,
                in("edx") (deadline >> 32) as u32,
                options(nostack),
            );
        }
    }

    fn name(&self) -> &'static str {
        "umwait"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_advance() {
        let a = cycles();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let b = cycles();
        assert!(b > a);
    }

    #[test]
    fn test_user_mode_runs_with_interrupts_enabled() {
        // The guard only issues sti when IF was set on entry
        assert!(interrupts_enabled());
    }

    #[test]
    fn test_probes_are_consistent() {
        // Repeated probes must agree; the answer itself depends on the CPU
        assert_eq!(cpu_supports_monitor(), cpu_supports_monitor());
        assert_eq!(cpu_supports_waitpkg(), cpu_supports_waitpkg());
    }

    #[test]
    fn test_umwait_matches_probe() {
        let umwait = Umwait::new(1000);
        assert_eq!(umwait.is_ok(), cpu_supports_waitpkg());
        if let Err(e) = umwait {
            assert_eq!(e, EngineError::Unsupported("WAITPKG"));
        }
    }

    #[test]
    fn test_umwait_returns_by_deadline() {
        if !cpu_supports_waitpkg() {
            return;
        }
        let (desc, _writer) = mwait_core::MonitoredCell::new_pair();
        let wait = Umwait::new(10_000).unwrap();
        let _guard = wait.suppress();
        wait.arm_and_wait(&desc);
    }
}
