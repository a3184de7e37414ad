//! The list of free blocks.
//!
//! The list is threaded through the free blocks themselves: the first word of
//! every free block holds the index of the next free block. As those blocks
//! are not in use by anybody, this does not need any extra memory. Only the
//! index of the head block is stored outside of the buffer.
use super::region::{BlockIndex, Region};

/// A block taken out of a [`FreeList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Popped {
    pub index: BlockIndex,
    /// The link of the block was corrupted, so the list ends here.
    pub truncated: bool,
}

/// A singly-linked LIFO list of free blocks.
#[derive(Debug, Default)]
pub struct FreeList {
    head: Option<BlockIndex>,
}
impl FreeList {
    /// Create an empty list.
    pub const fn new() -> Self {
        Self { head: None }
    }

    /// Check, whether there are no free blocks at all.
    pub const fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Put every block of the region into the list.
    ///
    /// The blocks are pushed in ascending address order, so the last block
    /// ends up at the head of the list and is handed out first.
    ///
    /// # Safety
    /// The caller must own every block of the region, i.e. no block may be
    /// accessed by anyone else while the list is rebuilt.
    pub unsafe fn rebuild(&mut self, region: &Region<'_>) {
        self.head = None;
        for index in region.indices() {
            // SAFETY: the caller owns all blocks
            unsafe { self.push(region, index) };
        }
    }

    /// Take the head block out of the list.
    ///
    /// If the link of the head block does not refer to a valid block (which
    /// can only happen, if a released block was written to), the rest of the
    /// list is dropped: the corrupted link is never followed. This is reported
    /// in [`Popped::truncated`].
    pub fn pop(&mut self, region: &Region<'_>) -> Option<Popped> {
        let index = self.head?;
        // SAFETY: the head is a free block (invariant of this type), whose
        // link was written by `push()`.
        let (head, truncated) = match unsafe { region.read_link(index) } {
            Ok(next) => (next, false),
            Err(()) => (None, true),
        };
        self.head = head;
        Some(Popped { index, truncated })
    }

    /// Drop every block from the list.
    pub fn truncate(&mut self) {
        self.head = None;
    }

    /// Put a block at the head of the list.
    ///
    /// # Safety
    /// The block must not be in the list already and must not be used by
    /// anyone else from now on.
    pub unsafe fn push(&mut self, region: &Region<'_>, index: BlockIndex) {
        // SAFETY: the block is free by the contract of this function
        unsafe { region.write_link(index, self.head) };
        self.head = Some(index);
    }

    /// The number of blocks reachable from the head, stopping at a corrupted
    /// link.
    #[cfg(test)]
    pub fn count(&self, region: &Region<'_>) -> usize {
        let mut count = 0;
        let mut next = self.head;
        while let Some(index) = next {
            count += 1;
            // SAFETY: every block reachable from the head is free
            next = unsafe { region.read_link(index) }.unwrap_or(None);
        }
        count
    }
}
