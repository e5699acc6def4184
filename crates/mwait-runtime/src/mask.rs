//! Scoped suppression of asynchronous events for user-mode waits
//!
//! In user mode the asynchronous events that cut a wait short are signals.
//! `SignalMask::block_all` blocks every maskable signal on the calling
//! thread and restores the previous mask when dropped, on every exit path.

use core::marker::PhantomData;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use nix::sys::signal::{SigSet, SigmaskHow};

        /// Thread signal mask guard
        pub struct SignalMask {
            previous: Option<SigSet>,
            _not_send: PhantomData<*const ()>,
        }

        impl SignalMask {
            /// Block all signals on this thread until the guard drops
            pub fn block_all() -> Self {
                let previous = match SigSet::all().thread_swap_mask(SigmaskHow::SIG_SETMASK) {
                    Ok(old) => Some(old),
                    Err(e) => {
                        mwait_core::kwarn!("Unable to mask signals: {}", e);
                        None
                    }
                };
                Self { previous, _not_send: PhantomData }
            }

            /// Whether the mask was actually installed
            pub fn is_active(&self) -> bool {
                self.previous.is_some()
            }
        }

        impl Drop for SignalMask {
            fn drop(&mut self) {
                if let Some(previous) = self.previous.take() {
                    if let Err(e) = previous.thread_set_mask() {
                        mwait_core::kerror!("Unable to restore signal mask: {}", e);
                    }
                }
            }
        }
    } else {
        /// No signal delivery to suppress on this platform
        pub struct SignalMask {
            _not_send: PhantomData<*const ()>,
        }

        impl SignalMask {
            pub fn block_all() -> Self {
                Self { _not_send: PhantomData }
            }

            pub fn is_active(&self) -> bool {
                false
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use nix::sys::signal::{SigSet, Signal};

    fn current_mask() -> SigSet {
        SigSet::thread_get_mask().unwrap()
    }

    #[test]
    fn test_mask_blocks_and_restores() {
        assert!(!current_mask().contains(Signal::SIGUSR1));
        {
            let guard = SignalMask::block_all();
            assert!(guard.is_active());
            assert!(current_mask().contains(Signal::SIGUSR1));
            assert!(current_mask().contains(Signal::SIGALRM));
        }
        assert!(!current_mask().contains(Signal::SIGUSR1));
    }

    #[test]
    fn test_mask_restored_on_unwind() {
        let result = std::panic::catch_unwind(|| {
            let _guard = SignalMask::block_all();
            panic!("inside the suppressed window");
        });
        assert!(result.is_err());
        assert!(!current_mask().contains(Signal::SIGUSR1));
    }

    #[test]
    fn test_nested_masks_restore_outer() {
        let outer = SignalMask::block_all();
        {
            let _inner = SignalMask::block_all();
        }
        assert!(current_mask().contains(Signal::SIGUSR1));
        drop(outer);
        assert!(!current_mask().contains(Signal::SIGUSR1));
    }
}
