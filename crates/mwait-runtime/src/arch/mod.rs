//! Architecture-specific primitives
//!
//! Cycle counter, CPU capability probes and the hardware wait backends.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub mod x86_64;
        pub use self::x86_64::{cycles, cpu_supports_monitor, cpu_supports_waitpkg};
    } else {
        pub mod generic;
        pub use self::generic::{cycles, cpu_supports_monitor, cpu_supports_waitpkg};
    }
}
