//! Fixed-block memory pool for embedded systems
//!
//! This crate provides a pool allocator for blocks of a single size, which are
//! carved out of a buffer supplied by the caller. It is meant for places
//! without a general-purpose allocator (or where one is not wanted): `no_std`
//! firmware, real-time code paths, packet buffers, etc. Allocation and release
//! are `O(1)` and the pool never allocates memory on its own.
//!
//! Besides handing out blocks, the pool detects the two typical bugs of
//! manual memory management: releasing a pointer, that is no block of the
//! pool, and releasing a block twice. Both are reported as an [`Error`]
//! instead of silently corrupting the pool.
//!
//! # Usage
//! Create a [`Pool`] over a buffer aligned to the desired block alignment.
//! ```
//! use blockpool::Pool;
//!
//! #[repr(align(8))]
//! struct Memory([u8; 4096]);
//!
//! let mut memory = Memory([0; 4096]);
//! let pool = Pool::new(&mut memory.0, 64, 8)?;
//! assert_eq!(pool.total_blocks(), 63); // one block is lost to the bitmap
//!
//! let block = pool.allocate()?;
//! assert!(pool.contains(block.as_ptr()));
//! pool.release(block.as_ptr())?;
//! assert_eq!(pool.release(block.as_ptr()), Err(blockpool::Error::DoubleFree));
//! # Ok::<(), blockpool::Error>(())
//! ```
//! The pool itself contains no synchronization. To share it between threads,
//! install a [`Lock`] via [`Pool::with_lock()`], e.g. a `spin::Mutex<()>` or a
//! [`FnLock`] built from a pair of callbacks. A pool without lock is not
//! [`Sync`], so this cannot be forgotten. For pools living in a `static`, see
//! [`LazyPool`].
//!
//! # Implementation
//! The buffer is split into the allocation bitmap and the block region:
//! ```text
//! +--------+-----+---------+---------+---------+---------+-----+--------+
//! | bitmap | pad | block 0 | block 1 | block 2 | block 3 | ... | unused |
//! +--------+-----+---------+---------+---------+---------+-----+--------+
//!   0110           free      used      used      free
//!                  next: -                       next: 0   <-- head
//! ```
//! 1.  On creation the [layout planning](pool::layout::plan) determines the
//!     largest number of blocks, that fits into the buffer together with a
//!     bitmap of one bit per block. The block region starts at the first
//!     address after the bitmap aligned to the block alignment.
//! 2.  Every free block stores the index of the next free block in its first
//!     machine word, forming the free list. Initially all blocks are pushed in
//!     ascending order, so the last block is the head of the list.
//! 3.  Allocating pops the head of the free list and sets the bit of the block
//!     in the bitmap.
//! 4.  Releasing checks, that the pointer is the start of a block of the
//!     region. Then the bit of the block is checked: if it is already clear,
//!     the block is not allocated and a double free is reported. Otherwise the
//!     bit is cleared and the block is pushed onto the free list.
//! 5.  Resetting clears the bitmap and rebuilds the free list, as if the pool
//!     was just created. Blocks handed out before are not revoked, but
//!     releasing them is reported as a double free.
#![no_std]

mod config;
mod error;
mod lazy;
pub mod pool;
mod stats;
mod sync;

pub use config::PoolConfig;
pub use error::Error;
pub use lazy::LazyPool;
pub use pool::layout::{Geometry, MIN_BLOCK_SIZE};
pub use pool::Pool;
pub use stats::Statistics;
pub use sync::{FnLock, Lock, NoLock};
