//! Raw access to the blocks of the caller buffer.
use super::layout::Geometry;

use core::marker::PhantomData;
use core::ptr::{self, NonNull};

/// The link value marking the end of the free list.
const END_OF_LIST: usize = usize::MAX;

/// An index of a block, that is validated and known to be in bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockIndex(usize);
impl BlockIndex {
    /// The raw numeric index.
    pub const fn get(self) -> usize {
        self.0
    }
}

/// The block part of the caller buffer.
///
/// This type does not hand out references to the block memory, only raw
/// pointers: blocks are given to the user of the pool, which may write to
/// them at any time. Therefore the memory is only ever accessed through the
/// pointer derived from the original mutable borrow of the buffer.
pub struct Region<'buf> {
    start: NonNull<u8>,
    block_size: usize,
    total_blocks: usize,
    _buffer: PhantomData<&'buf mut [u8]>,
}
impl<'buf> Region<'buf> {
    /// Take the block part of the buffer, which has to be exactly
    /// `geometry.blocks_size()` bytes long.
    ///
    /// # Panics
    /// This function panics, if the memory size does not match the geometry.
    pub fn new(blocks: &'buf mut [u8], geometry: &Geometry) -> Self {
        assert_eq!(blocks.len(), geometry.blocks_size());
        Self {
            start: NonNull::from(blocks).cast(),
            block_size: geometry.block_size,
            total_blocks: geometry.total_blocks,
            _buffer: PhantomData,
        }
    }

    /// The address of the first block.
    pub fn start(&self) -> usize {
        self.start.as_ptr() as usize
    }

    /// The address one past the last block.
    pub fn end(&self) -> usize {
        self.start() + self.total_blocks * self.block_size
    }

    /// Validate a raw block number.
    pub fn index(&self, n: usize) -> Option<BlockIndex> {
        (n < self.total_blocks).then_some(BlockIndex(n))
    }

    /// Iterate over all blocks in ascending address order.
    pub fn indices(&self) -> impl Iterator<Item = BlockIndex> {
        (0..self.total_blocks).map(BlockIndex)
    }

    /// Check, whether the address lies anywhere inside the block region.
    pub fn contains(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        addr >= self.start() && addr < self.end()
    }

    /// Obtain the index of the block starting exactly at `ptr`.
    ///
    /// `None` is returned for pointers outside of the region and for pointers
    /// into the middle of a block.
    pub fn index_of(&self, ptr: *const u8) -> Option<BlockIndex> {
        if !self.contains(ptr) {
            return None;
        }
        let offset = ptr as usize - self.start();
        (offset % self.block_size == 0).then(|| BlockIndex(offset / self.block_size))
    }

    /// Obtain the pointer to the first byte of a block.
    pub fn block(&self, index: BlockIndex) -> NonNull<u8> {
        // SAFETY: the index is validated to be less than the number of blocks,
        // so the offset stays inside the region, which came from a non-null
        // slice. Adding to a non-null in-bounds pointer does not yield null.
        unsafe { NonNull::new_unchecked(self.start.as_ptr().add(index.0 * self.block_size)) }
    }

    /// Store the free-list link `next` in the memory of the block `index`.
    ///
    /// # Safety
    /// The block must not be in use by anyone else, i.e. it has to be free or
    /// about to become free, and the caller needs exclusive access to the
    /// free list.
    pub unsafe fn write_link(&self, index: BlockIndex, next: Option<BlockIndex>) {
        let link = next.map_or(END_OF_LIST, BlockIndex::get);
        // SAFETY: the block is at least a word large (checked by the layout
        // planning), therefore the write is in bounds. Blocks may be aligned
        // to less than a word, hence the unaligned write. Exclusive access is
        // guaranteed by the caller.
        unsafe { ptr::write_unaligned(self.block(index).as_ptr().cast::<usize>(), link) };
    }

    /// Read the free-list link from the memory of the block `index`.
    ///
    /// A link not referring to a valid block (including a link, that was
    /// overwritten by a use-after-free) reads as `Err(())`.
    ///
    /// # Safety
    /// The block has to be free and its link must have been written by
    /// [`write_link()`](Self::write_link) before.
    pub unsafe fn read_link(&self, index: BlockIndex) -> Result<Option<BlockIndex>, ()> {
        // SAFETY: see `write_link()`, the block memory is initialized, since
        // the link was written before.
        let link = unsafe { ptr::read_unaligned(self.block(index).as_ptr().cast::<usize>()) };
        match link {
            END_OF_LIST => Ok(None),
            n => self.index(n).map(Some).ok_or(()),
        }
    }
}
