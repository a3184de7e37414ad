//! A pool, that is declared before its buffer is available.
use crate::sync::{Lock, NoLock};
use crate::{Error, Pool, Statistics};

use core::ptr::NonNull;

/// A [`Pool`], that can be placed into a `static` and is bound to its buffer
/// later on.
///
/// Until [`init()`](Self::init) is called, every operation reports
/// [`Error::NotInitialized`]. This mirrors the typical embedded start-up: the
/// pool is a global, while the memory is set up by the board initialization.
/// ```
/// use blockpool::{LazyPool, Pool, Error};
///
/// static POOL: LazyPool<'static, spin::Mutex<()>> = LazyPool::new();
///
/// assert_eq!(POOL.allocate(), Err(Error::NotInitialized));
///
/// #[repr(align(8))]
/// struct Memory([u8; 512]);
/// let memory = Box::leak(Box::new(Memory([0; 512])));
/// let lock: spin::Mutex<()> = spin::Mutex::new(());
/// POOL.init(Pool::new(&mut memory.0, 64, 8)?.with_lock(lock))?;
///
/// let block = POOL.allocate()?;
/// POOL.release(block.as_ptr())?;
/// # Ok::<(), blockpool::Error>(())
/// ```
pub struct LazyPool<'buf, L = NoLock> {
    pool: spin::Once<Pool<'buf, L>>,
}
impl<'buf, L: Lock> LazyPool<'buf, L> {
    /// Create a pool without memory.
    pub const fn new() -> Self {
        Self {
            pool: spin::Once::new(),
        }
    }

    /// Bind the pool.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if the pool was bound before. The passed
    /// pool is dropped in this case, giving its buffer back.
    pub fn init(&self, pool: Pool<'buf, L>) -> Result<(), Error> {
        let mut installed = false;
        self.pool.call_once(|| {
            installed = true;
            pool
        });
        if installed {
            Ok(())
        } else {
            Err(Error::InvalidArgument)
        }
    }

    /// Check, whether the pool is bound to its memory.
    pub fn is_initialized(&self) -> bool {
        self.pool.is_completed()
    }

    /// Obtain the bound pool.
    ///
    /// # Errors
    /// [`Error::NotInitialized`] if [`init()`](Self::init) was not called yet.
    pub fn get(&self) -> Result<&Pool<'buf, L>, Error> {
        self.pool.get().ok_or(Error::NotInitialized)
    }

    /// See [`Pool::allocate()`].
    pub fn allocate(&self) -> Result<NonNull<u8>, Error> {
        self.get()?.allocate()
    }

    /// See [`Pool::release()`].
    pub fn release(&self, ptr: *mut u8) -> Result<(), Error> {
        self.get()?.release(ptr)
    }

    /// See [`Pool::reset()`].
    pub fn reset(&self) -> Result<(), Error> {
        self.get()?.reset()
    }

    /// See [`Pool::stats()`].
    pub fn stats(&self) -> Result<Statistics, Error> {
        self.get()?.stats()
    }

    /// See [`Pool::contains()`]. An unbound pool contains nothing.
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.get().map_or(false, |pool| pool.contains(ptr))
    }
}
impl<L: Lock> Default for LazyPool<'_, L> {
    fn default() -> Self {
        Self::new()
    }
}
