//! The allocation bitmap: one bit per block, set while the block is in use.
use super::region::BlockIndex;

/// The allocation state of all blocks of a pool.
///
/// Block `i` is stored in byte `i / 8` at bit `i % 8`. A cleared bit means
/// "free", a set bit means "allocated". This is the only place, that can tell
/// a legitimate free apart from a double free: a block popped from the free
/// list and pushed back again looks the same either way.
pub struct Bitmap<'buf>(&'buf mut [u8]);
impl<'buf> Bitmap<'buf> {
    /// Take the bitmap part of the buffer and mark every block as free.
    pub fn new(memory: &'buf mut [u8]) -> Self {
        let mut bitmap = Self(memory);
        bitmap.clear_all();
        bitmap
    }

    const fn position(index: BlockIndex) -> (usize, u8) {
        (index.get() / 8, 1 << (index.get() % 8))
    }

    /// Check, whether the block is marked as allocated.
    pub fn is_set(&self, index: BlockIndex) -> bool {
        let (byte, mask) = Self::position(index);
        self.0[byte] & mask != 0
    }

    /// Mark the block as allocated.
    pub fn set(&mut self, index: BlockIndex) {
        let (byte, mask) = Self::position(index);
        self.0[byte] |= mask;
    }

    /// Mark the block as free.
    pub fn clear(&mut self, index: BlockIndex) {
        let (byte, mask) = Self::position(index);
        self.0[byte] &= !mask;
    }

    /// Mark every block as free.
    pub fn clear_all(&mut self) {
        self.0.fill(0);
    }

    /// The number of blocks marked as allocated.
    #[cfg(test)]
    pub fn count_set(&self) -> usize {
        self.0.iter().map(|byte| byte.count_ones() as usize).sum()
    }
}
