//! The fixed-block pool and its support types.
//!
//! A pool is made of three parts, each in its own module: the [layout
//! planning](layout) splitting the buffer, the [allocation bitmap](bitmap) and
//! the [free list](free_list), which is stored inside the [block
//! region](region).
pub mod layout;

mod bitmap;
mod free_list;
mod region;

use crate::stats::Statistics;
use crate::sync::{Lock, LockGuard, NoLock};
use crate::{Error, PoolConfig};
use bitmap::Bitmap;
use free_list::FreeList;
use layout::Geometry;
use region::{BlockIndex, Region};

use core::cell::UnsafeCell;
use core::fmt;
use core::ptr::NonNull;

/// The mutable part of a pool, only accessed while holding the lock.
struct State<'buf> {
    bitmap: Bitmap<'buf>,
    free_list: FreeList,
    free_blocks: usize,
    stats: Statistics,
}

/// An inconsistency of the free list found while allocating.
///
/// It is logged after the lock is released.
enum Corruption {
    /// The link stored in the block does not refer to a block.
    Link(BlockIndex),
    /// The head of the free list is an allocated block.
    Allocated(BlockIndex),
}

/// A pool of equally sized blocks carved out of a caller-supplied buffer.
///
/// The pool borrows the buffer for its whole lifetime; dropping the pool gives
/// the buffer back. Blocks are handed out as raw pointers, as the pool cannot
/// know the type stored inside. A block stays valid until it is released, the
/// pool is [reset](Self::reset) or the pool is dropped.
///
/// The type parameter `L` is the [`Lock`] acquired around every operation. By
/// default this is [`NoLock`], which makes the pool usable from a single
/// thread only. Use [`with_lock()`](Self::with_lock) to share the pool:
/// ```
/// use blockpool::Pool;
///
/// #[repr(align(8))]
/// struct Memory([u8; 1024]);
///
/// let mut memory = Memory([0; 1024]);
/// let lock: spin::Mutex<()> = spin::Mutex::new(());
/// let pool = Pool::new(&mut memory.0, 32, 8)?.with_lock(lock);
///
/// std::thread::scope(|s| {
///     for _ in 0..4 {
///         s.spawn(|| {
///             let block = pool.allocate().unwrap();
///             pool.release(block.as_ptr()).unwrap();
///         });
///     }
/// });
/// assert_eq!(pool.stats()?.alloc_count, 4);
/// # Ok::<(), blockpool::Error>(())
/// ```
pub struct Pool<'buf, L = NoLock> {
    geometry: Geometry,
    region: Region<'buf>,
    state: UnsafeCell<State<'buf>>,
    lock: L,
}

// SAFETY: the pool exclusively borrows the buffer, so moving the pool to
// another thread moves the whole buffer with it.
unsafe impl<L: Lock + Send> Send for Pool<'_, L> {}
// SAFETY: the mutable state is only accessed while holding the lock and the
// `Lock`-contract guarantees mutual exclusion for `Sync` locks. The geometry
// and region are never modified.
unsafe impl<L: Lock + Sync> Sync for Pool<'_, L> {}

impl<'buf> Pool<'buf> {
    /// Create a pool of blocks of (at least) `block_size` bytes aligned to
    /// `alignment` inside `buffer`.
    ///
    /// The beginning of the buffer is used for the allocation bitmap, the
    /// blocks follow after it. The number of blocks is the largest one, for
    /// which the blocks and the bitmap fit into the buffer.
    ///
    /// # Errors
    /// - [`Error::InvalidSize`] if the buffer or the block size is zero, if the
    ///   block size is less than a machine word or if not a single block fits.
    /// - [`Error::Alignment`] if `alignment` is not a power of two or if the
    ///   buffer itself is not aligned to it.
    pub fn new(buffer: &'buf mut [u8], block_size: usize, alignment: usize) -> Result<Self, Error> {
        let geometry = layout::plan(
            buffer.as_ptr() as usize,
            buffer.len(),
            block_size,
            alignment,
        )?;

        let (bitmap, rest) = buffer.split_at_mut(geometry.blocks_offset);
        let bitmap = Bitmap::new(&mut bitmap[..geometry.bitmap_bytes]);
        let region = Region::new(&mut rest[..geometry.blocks_size()], &geometry);
        let mut free_list = FreeList::new();
        // SAFETY: the region was just borrowed from the buffer, no block is
        // handed out yet.
        unsafe { free_list.rebuild(&region) };

        log::debug!(
            "pool of {} blocks of {} bytes at {:#x} (bitmap {} bytes)",
            geometry.total_blocks,
            geometry.block_size,
            region.start(),
            geometry.bitmap_bytes
        );

        Ok(Self {
            state: UnsafeCell::new(State {
                bitmap,
                free_list,
                free_blocks: geometry.total_blocks,
                stats: Statistics::new(&geometry),
            }),
            geometry,
            region,
            lock: NoLock::new(),
        })
    }

    /// Create a pool from a [`PoolConfig`].
    ///
    /// See [`new()`](Self::new) for details and errors.
    pub fn with_config(buffer: &'buf mut [u8], config: PoolConfig) -> Result<Self, Error> {
        Self::new(buffer, config.block_size, config.alignment)
    }
}

impl<'buf, L: Lock> Pool<'buf, L> {
    /// Replace the lock of this pool.
    ///
    /// Since this consumes the pool, it can only happen before the pool is
    /// shared with other threads.
    pub fn with_lock<M: Lock>(self, lock: M) -> Pool<'buf, M> {
        let Self {
            geometry,
            region,
            state,
            lock: _,
        } = self;
        Pool {
            geometry,
            region,
            state,
            lock,
        }
    }

    /// Remove the lock of this pool, disabling synchronization.
    pub fn without_lock(self) -> Pool<'buf> {
        self.with_lock(NoLock::new())
    }

    /// Run `f` with exclusive access to the pool state.
    fn locked<R>(&self, f: impl FnOnce(&Region<'buf>, &mut State<'buf>) -> R) -> R {
        let _guard = LockGuard::new(&self.lock);
        // SAFETY: the lock is held for the whole lifetime of the reference. If
        // the lock is `NoLock`, the pool is not `Sync` and the state is only
        // reachable from the current thread. `f` is internal and does not
        // call back into the pool, especially it does not log: the logger is
        // user code, that may use this pool as well.
        let state = unsafe { &mut *self.state.get() };
        f(&self.region, state)
    }

    /// Take a block out of the pool.
    ///
    /// The returned pointer is aligned to the pool alignment and valid for
    /// reads and writes of [`block_size()`](Self::block_size) bytes. Its
    /// contents are unspecified.
    ///
    /// # Errors
    /// [`Error::OutOfMemory`] if all blocks are in use.
    pub fn allocate(&self) -> Result<NonNull<u8>, Error> {
        let (result, corruption) = self.locked(|region, state| {
            if state.free_list.is_empty() || state.free_blocks == 0 {
                return (Err(Error::OutOfMemory), None);
            }
            let Some(popped) = state.free_list.pop(region) else {
                return (Err(Error::OutOfMemory), None);
            };
            if state.bitmap.is_set(popped.index) {
                // a link was overwritten with the index of a used block
                state.free_list.truncate();
                return (Err(Error::OutOfMemory), Some(Corruption::Allocated(popped.index)));
            }
            state.free_blocks -= 1;
            state.stats.record_allocation(state.free_blocks);
            state.bitmap.set(popped.index);

            let corruption = popped.truncated.then_some(Corruption::Link(popped.index));
            (Ok(popped.index), corruption)
        });

        match corruption {
            Some(Corruption::Link(index)) => {
                log::warn!("free list link of block {} is corrupted", index.get());
            }
            Some(Corruption::Allocated(index)) => {
                log::warn!("free list refers to allocated block {}", index.get());
            }
            None => {}
        }
        let block = self.region.block(result?);
        log::trace!("allocated block at {:p}", block);
        Ok(block)
    }

    /// Give a block back to the pool.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if `ptr` is null.
    /// - [`Error::InvalidBlock`] if `ptr` does not point to the start of a
    ///   block of this pool.
    /// - [`Error::DoubleFree`] if the block is not allocated. This includes
    ///   blocks, that were handed out before a [`reset()`](Self::reset).
    pub fn release(&self, ptr: *mut u8) -> Result<(), Error> {
        if ptr.is_null() {
            return Err(Error::InvalidArgument);
        }
        let index = self.region.index_of(ptr).ok_or_else(|| {
            log::warn!("release of {:p}, which is not a block of this pool", ptr);
            Error::InvalidBlock
        })?;

        let total_blocks = self.geometry.total_blocks;
        let result = self.locked(|region, state| {
            if !state.bitmap.is_set(index) {
                return Err(Error::DoubleFree);
            }
            state.bitmap.clear(index);
            // SAFETY: the bit was set, so the block was handed out and is not
            // in the free list. The caller gives up the block by releasing it.
            unsafe { state.free_list.push(region, index) };
            if state.free_blocks < total_blocks {
                state.free_blocks += 1;
            }
            state.stats.record_release(state.free_blocks);
            Ok(())
        });

        match result {
            Ok(()) => log::trace!("released block {} at {:p}", index.get(), ptr),
            Err(_) => log::warn!("double free of block {} at {:p}", index.get(), ptr),
        }
        result
    }

    /// Make every block available again and clear the statistics.
    ///
    /// Blocks, that are still handed out, are *not* revoked in any way. Using
    /// them after the reset is a bug, releasing them reports
    /// [`Error::DoubleFree`].
    pub fn reset(&self) -> Result<(), Error> {
        let geometry = self.geometry;
        self.locked(|region, state| {
            state.bitmap.clear_all();
            // SAFETY: all blocks are taken back by the contract of `reset()`
            unsafe { state.free_list.rebuild(region) };
            state.free_blocks = geometry.total_blocks;
            state.stats = Statistics::new(&geometry);
        });
        log::debug!("pool at {:#x} reset", self.region.start());
        Ok(())
    }

    /// Obtain a snapshot of the usage statistics.
    pub fn stats(&self) -> Result<Statistics, Error> {
        Ok(self.locked(|_, state| state.stats))
    }

    /// Check, whether `ptr` points into the block memory of this pool.
    ///
    /// This is a pure range check, it does not tell whether the block is
    /// allocated. It does not take the lock.
    pub fn contains(&self, ptr: *const u8) -> bool {
        !ptr.is_null() && self.region.contains(ptr)
    }

    /// The size of each block, i.e. the requested size rounded up to the
    /// alignment.
    pub fn block_size(&self) -> usize {
        self.geometry.block_size
    }

    /// The number of blocks in this pool.
    pub fn total_blocks(&self) -> usize {
        self.geometry.total_blocks
    }

    /// The alignment of every block.
    pub fn alignment(&self) -> usize {
        self.geometry.alignment
    }

    /// The number of bytes usable for blocks.
    pub fn capacity_bytes(&self) -> usize {
        self.geometry.blocks_size()
    }

    /// The layout of the pool inside the buffer.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}

impl<L> fmt::Debug for Pool<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("geometry", &self.geometry)
            .field("blocks_start", &(self.region.start() as *const u8))
            .finish_non_exhaustive()
    }
}
