//! CPU placement policies
//!
//! The hardware wait parks the CPU it runs on, so the monitor and the
//! worker are pinned to distinct CPUs before either loop starts.

use mwait_core::{Placement, PlacementError, Role};

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        use nix::sched::{sched_setaffinity, CpuSet};
        use nix::unistd::Pid;

        /// Pins the calling thread to exactly one CPU via `sched_setaffinity`
        #[derive(Debug, Default, Clone, Copy)]
        pub struct AffinityPlacement;

        impl AffinityPlacement {
            pub fn new() -> Self {
                Self
            }
        }

        impl Placement for AffinityPlacement {
            fn apply(&self, role: Role, cpu: usize) -> Result<(), PlacementError> {
                let mut set = CpuSet::new();
                set.set(cpu).map_err(|_| PlacementError::InvalidCpu(cpu))?;

                // Pid 0 targets the calling thread
                sched_setaffinity(Pid::from_raw(0), &set).map_err(|e| match e {
                    nix::errno::Errno::EINVAL => PlacementError::InvalidCpu(cpu),
                    other => PlacementError::Os(other as i32),
                })?;

                mwait_core::kdebug!("Pinned {} thread to cpu {}", role, cpu);
                Ok(())
            }

            fn current_cpu(&self) -> Option<usize> {
                // SAFETY: sched_getcpu has no preconditions.
                let cpu = unsafe { libc::sched_getcpu() };
                usize::try_from(cpu).ok()
            }
        }
    } else {
        /// Affinity is not available on this platform
        #[derive(Debug, Default, Clone, Copy)]
        pub struct AffinityPlacement;

        impl AffinityPlacement {
            pub fn new() -> Self {
                Self
            }
        }

        impl Placement for AffinityPlacement {
            fn apply(&self, _role: Role, _cpu: usize) -> Result<(), PlacementError> {
                Err(PlacementError::Unsupported)
            }

            fn current_cpu(&self) -> Option<usize> {
                None
            }
        }
    }
}

/// Accepts every request and pins nothing
///
/// Reports no current CPU, so the distinct-CPU assertion is skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPlacement;

impl Placement for NoPlacement {
    fn apply(&self, role: Role, cpu: usize) -> Result<(), PlacementError> {
        mwait_core::ktrace!("Placement disabled; {} thread not pinned to cpu {}", role, cpu);
        Ok(())
    }

    fn current_cpu(&self) -> Option<usize> {
        None
    }
}
