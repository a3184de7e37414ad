//! Usage statistics of a pool.
use crate::pool::layout::Geometry;

/// A snapshot of the usage counters of a [`Pool`](crate::Pool).
///
/// The block counts are always consistent with each other, i.e.
/// `used_blocks + free_blocks == total_blocks`. The cumulative counters wrap
/// around on overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Statistics {
    /// The number of blocks in the pool.
    pub total_blocks: u32,
    /// The number of blocks currently handed out.
    pub used_blocks: u32,
    /// The number of blocks currently available.
    pub free_blocks: u32,
    /// The highest number of simultaneously used blocks since the pool was
    /// created or last reset.
    pub peak_usage: u32,
    /// The number of successful allocations since creation or last reset.
    pub alloc_count: u32,
    /// The number of successful releases since creation or last reset.
    pub free_count: u32,
    /// The (aligned) size of a single block in bytes.
    pub block_size: u32,
}
impl Statistics {
    /// The statistics of a pool without any allocation.
    pub(crate) const fn new(geometry: &Geometry) -> Self {
        // both values are checked to fit into 32 bits by the layout planning
        Self {
            total_blocks: geometry.total_blocks as u32,
            used_blocks: 0,
            free_blocks: geometry.total_blocks as u32,
            peak_usage: 0,
            alloc_count: 0,
            free_count: 0,
            block_size: geometry.block_size as u32,
        }
    }

    /// Account for a successful allocation, after which `free_blocks` blocks
    /// are left.
    pub(crate) fn record_allocation(&mut self, free_blocks: usize) {
        self.alloc_count = self.alloc_count.wrapping_add(1);
        self.update_usage(free_blocks);
        self.peak_usage = self.peak_usage.max(self.used_blocks);
    }

    /// Account for a successful release, after which `free_blocks` blocks are
    /// available.
    pub(crate) fn record_release(&mut self, free_blocks: usize) {
        self.free_count = self.free_count.wrapping_add(1);
        self.update_usage(free_blocks);
    }

    fn update_usage(&mut self, free_blocks: usize) {
        self.free_blocks = free_blocks as u32;
        self.used_blocks = self.total_blocks - self.free_blocks;
    }

    /// The share of used blocks in percent (`0..=100`).
    pub fn utilization(&self) -> u32 {
        if self.total_blocks == 0 {
            return 0;
        }
        (u64::from(self.used_blocks) * 100 / u64::from(self.total_blocks)) as u32
    }
}
