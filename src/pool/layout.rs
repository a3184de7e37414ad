//! Partitioning of a raw buffer into the bitmap and the block region.
//!
//! The buffer handed to a [`Pool`](crate::Pool) is split into three parts:
//! ```text
//! +--------+---------+--------+--------+-----+--------+---------+
//! | bitmap | padding | block0 | block1 | ... | blockN | unused  |
//! +--------+---------+--------+--------+-----+--------+---------+
//! ^        ^         ^
//! start    bitmap    blocks_offset (multiple of the alignment)
//!          end
//! ```
//! The bitmap needs one bit per block, so its size depends on the number of
//! blocks, which in turn depends on the space left after the bitmap. The
//! planner resolves this by starting with the number of blocks, that would fit
//! without any bitmap, and decreasing it until bitmap, padding and blocks fit
//! together.
use crate::Error;
use core::mem;

/// The smallest block size, that can be managed.
///
/// A free block stores the index of the next free block in its own memory,
/// which takes one machine word.
pub const MIN_BLOCK_SIZE: usize = mem::size_of::<usize>();

/// The result of the layout planning: the geometry of a pool.
///
/// This is computed once on pool creation and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// The size of a block rounded up to the alignment.
    pub block_size: usize,
    /// The number of blocks in the pool.
    pub total_blocks: usize,
    /// The number of bytes used for the allocation bitmap.
    pub bitmap_bytes: usize,
    /// The offset of the first block from the start of the buffer.
    pub blocks_offset: usize,
    /// The alignment of every block.
    pub alignment: usize,
}
impl Geometry {
    /// The number of buffer bytes actually used by the bitmap, the padding and
    /// the blocks. Any remaining bytes at the end of the buffer are unused.
    pub const fn required_size(&self) -> usize {
        self.blocks_offset + self.total_blocks * self.block_size
    }

    /// The number of bytes in the block region.
    pub const fn blocks_size(&self) -> usize {
        self.total_blocks * self.block_size
    }
}

/// Round `value` up to the next multiple of `alignment`.
///
/// The alignment has to be a power of two. `None` is returned on overflow.
const fn align_up(value: usize, alignment: usize) -> Option<usize> {
    let mask = alignment - 1;
    match value.checked_add(mask) {
        Some(value) => Some(value & !mask),
        None => None,
    }
}

/// Plan the layout of a buffer of `buffer_size` bytes starting at address
/// `start`.
///
/// # Errors
/// - [`Error::InvalidSize`] if `buffer_size` or `block_size` is zero, if the
///   block is smaller than [`MIN_BLOCK_SIZE`], if not a single block fits
///   next to its bitmap or if the block count exceeds the 32-bit counters.
/// - [`Error::Alignment`] if `alignment` is not a power of two or `start` is
///   not aligned to it.
pub fn plan(
    start: usize,
    buffer_size: usize,
    block_size: usize,
    alignment: usize,
) -> Result<Geometry, Error> {
    if buffer_size == 0 || block_size == 0 {
        return Err(Error::InvalidSize);
    }
    if !alignment.is_power_of_two() {
        return Err(Error::Alignment);
    }
    if start & (alignment - 1) != 0 {
        return Err(Error::Alignment);
    }
    if block_size < MIN_BLOCK_SIZE {
        return Err(Error::InvalidSize);
    }

    let aligned_block_size = align_up(block_size, alignment).ok_or(Error::InvalidSize)?;
    let max_blocks = buffer_size / aligned_block_size;
    if max_blocks == 0 {
        return Err(Error::InvalidSize);
    }

    // the largest block count, for which bitmap, padding and blocks fit
    let (total_blocks, bitmap_bytes, blocks_offset) = (1..=max_blocks)
        .rev()
        .find_map(|n| {
            let bitmap_bytes = (n + 7) / 8;
            let blocks_offset = align_up(bitmap_bytes, alignment)?;
            let required = blocks_offset.checked_add(n.checked_mul(aligned_block_size)?)?;
            (required <= buffer_size).then_some((n, bitmap_bytes, blocks_offset))
        })
        .ok_or(Error::InvalidSize)?;

    if total_blocks > u32::MAX as usize
        || bitmap_bytes > u32::MAX as usize
        || aligned_block_size > u32::MAX as usize
    {
        return Err(Error::InvalidSize);
    }

    Ok(Geometry {
        block_size: aligned_block_size,
        total_blocks,
        bitmap_bytes,
        blocks_offset,
        alignment,
    })
}

#[cfg(test)]
mod tests {
    use super::{align_up, plan, Geometry, MIN_BLOCK_SIZE};
    use crate::Error;

    #[test]
    fn rounding_up() {
        assert_eq!(align_up(0, 8), Some(0));
        assert_eq!(align_up(1, 8), Some(8));
        assert_eq!(align_up(8, 8), Some(8));
        assert_eq!(align_up(13, 4), Some(16));
        assert_eq!(align_up(5, 1), Some(5));
        assert_eq!(align_up(usize::MAX, 2), None);
    }

    #[test]
    fn page_of_64_byte_blocks() {
        let geometry = plan(0x1000, 4096, 64, 8).unwrap();
        // 64 blocks would need 4096 bytes plus the bitmap, so one is lost
        assert_eq!(
            geometry,
            Geometry {
                block_size: 64,
                total_blocks: 63,
                bitmap_bytes: 8,
                blocks_offset: 8,
                alignment: 8,
            }
        );
        assert!(geometry.required_size() <= 4096);
    }

    #[test]
    fn block_size_is_rounded_to_alignment() {
        let geometry = plan(0, 1024, 20, 16).unwrap();
        assert_eq!(geometry.block_size, 32);
        assert_eq!(geometry.blocks_offset % 16, 0);
        assert_eq!(geometry.total_blocks, 31);
    }

    #[test]
    fn bitmap_padding_is_paid_from_the_buffer() {
        // 2 blocks of 32 would fill the buffer exactly, but the bitmap byte
        // plus padding to 32 leaves room for a single block only.
        let geometry = plan(0, 64, 32, 32).unwrap();
        assert_eq!(geometry.total_blocks, 1);
        assert_eq!(geometry.bitmap_bytes, 1);
        assert_eq!(geometry.blocks_offset, 32);
        assert_eq!(geometry.required_size(), 64);
    }

    #[test]
    fn alignment_of_one() {
        let geometry = plan(3, 17 + 1, MIN_BLOCK_SIZE, 1).unwrap();
        assert_eq!(geometry.blocks_offset, 1);
        assert_eq!(geometry.total_blocks, 17 / MIN_BLOCK_SIZE);
    }

    #[test]
    fn invalid_alignment() {
        assert_eq!(plan(0, 4096, 64, 7), Err(Error::Alignment));
        assert_eq!(plan(0, 4096, 64, 0), Err(Error::Alignment));
        assert_eq!(plan(1, 4096, 64, 8), Err(Error::Alignment));
        assert_eq!(plan(4, 4096, 64, 8), Err(Error::Alignment));
    }

    #[test]
    fn invalid_sizes() {
        assert_eq!(plan(0, 0, 64, 8), Err(Error::InvalidSize));
        assert_eq!(plan(0, 4096, 0, 8), Err(Error::InvalidSize));
        assert_eq!(plan(0, 4096, MIN_BLOCK_SIZE - 1, 8), Err(Error::InvalidSize));
        // a single block does not fit at all
        assert_eq!(plan(0, 32, 64, 8), Err(Error::InvalidSize));
        // a single block fits, but not together with its bitmap
        assert_eq!(plan(0, 64, 64, 8), Err(Error::InvalidSize));
    }

    #[test]
    fn smallest_possible_pool() {
        let geometry = plan(0, 2 * MIN_BLOCK_SIZE, MIN_BLOCK_SIZE, MIN_BLOCK_SIZE).unwrap();
        assert_eq!(geometry.total_blocks, 1);
        assert_eq!(geometry.blocks_offset, MIN_BLOCK_SIZE);
    }

    #[test]
    fn planning_never_exceeds_the_buffer() {
        for buffer_size in (1..600).step_by(7) {
            for block_size in [8, 12, 16, 24, 40, 64] {
                for alignment in [1, 2, 4, 8, 16, 32] {
                    if let Ok(geometry) = plan(0, buffer_size, block_size, alignment) {
                        assert!(geometry.required_size() <= buffer_size);
                        assert_eq!(geometry.blocks_offset % alignment, 0);
                        assert_eq!(geometry.block_size % alignment, 0);
                        assert!(geometry.bitmap_bytes * 8 >= geometry.total_blocks);
                        assert!(geometry.blocks_offset >= geometry.bitmap_bytes);
                    }
                }
            }
        }
    }
}
