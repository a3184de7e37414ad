//! Pool parameters, that can be set up at compile time.
use crate::pool::layout::MIN_BLOCK_SIZE;

use core::mem;

/// The parameters of a [`Pool`](crate::Pool).
///
/// The configuration is validated when creating the pool, so creating one
/// never fails. It is usable in `const` contexts:
/// ```
/// use blockpool::PoolConfig;
///
/// const PACKETS: PoolConfig = PoolConfig::new(256).with_alignment(16);
/// assert_eq!(PACKETS.block_size, 256);
/// assert_eq!(PACKETS.alignment, 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// The requested size of a block. This is rounded up to the alignment.
    pub block_size: usize,
    /// The alignment of every block. Has to be a power of two.
    pub alignment: usize,
}
impl PoolConfig {
    /// Create a configuration for blocks of `block_size` bytes aligned to a
    /// machine word.
    pub const fn new(block_size: usize) -> Self {
        Self {
            block_size,
            alignment: mem::align_of::<usize>(),
        }
    }

    /// Change the alignment of the blocks.
    #[must_use]
    pub const fn with_alignment(self, alignment: usize) -> Self {
        Self { alignment, ..self }
    }

    /// Create a configuration, where every block can hold a `T`.
    ///
    /// Types smaller than a machine word get blocks of a machine word, since
    /// a free block has to hold the free-list link.
    pub const fn for_type<T>() -> Self {
        let size = mem::size_of::<T>();
        Self {
            block_size: if size < MIN_BLOCK_SIZE { MIN_BLOCK_SIZE } else { size },
            alignment: mem::align_of::<T>(),
        }
    }
}
