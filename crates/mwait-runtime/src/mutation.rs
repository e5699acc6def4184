//! Worker write traffic

use mwait_core::MutationSource;

/// Writes the counter value whenever its masked bits are all zero
///
/// With the default mask of 0xff that is roughly one iteration in 256.
#[derive(Debug, Clone, Copy)]
pub struct LowByteZero {
    mask: u64,
}

impl LowByteZero {
    pub fn new(mask: u64) -> Self {
        Self { mask }
    }

    pub fn mask(&self) -> u64 {
        self.mask
    }
}

impl Default for LowByteZero {
    fn default() -> Self {
        Self::new(mwait_core::constants::DEFAULT_WRITE_MASK)
    }
}

impl MutationSource for LowByteZero {
    #[inline]
    fn next(&mut self, tick: u64) -> Option<u64> {
        (tick & self.mask == 0).then_some(tick)
    }
}
