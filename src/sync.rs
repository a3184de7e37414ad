//! Pluggable mutual exclusion for sharing a pool between threads.
//!
//! A [`Pool`](crate::Pool) does not contain any synchronization primitive on
//! its own, as there is no single primitive, that fits every environment: an
//! interrupt-free critical section on a single-core micro-controller, a spin
//! lock on a multi-core one or an operating system mutex on a hosted target.
//! Instead, the pool is generic over a [`Lock`], that is acquired around every
//! operation touching the pool state.
//!
//! There are three kinds of locks:
//! - [`NoLock`] disables synchronization. A pool using it cannot be shared
//!   between threads at all (it is not [`Sync`]).
//! - every [`lock_api::RawMutex`], e.g. `spin::Mutex<()>`.
//! - [`FnLock`], a pair of closures for acquiring and releasing a lock, that
//!   is managed elsewhere.
use core::cell::Cell;
use core::marker::PhantomData;

/// A mutual exclusion primitive, that can be acquired and released.
///
/// # Safety
/// Implementors have to guarantee mutual exclusion if they are [`Sync`]:
/// after [`acquire()`](Self::acquire) returns, no other thread may return from
/// `acquire()` until [`release()`](Self::release) is called.
pub unsafe trait Lock {
    /// Acquire the lock, blocking (or spinning) until it is available.
    fn acquire(&self);

    /// Release the lock.
    ///
    /// # Safety
    /// The lock has to be held by the current context.
    unsafe fn release(&self);
}

// SAFETY: a raw mutex provides mutual exclusion by its own contract
unsafe impl<R: lock_api::RawMutex> Lock for R {
    fn acquire(&self) {
        self.lock();
    }

    unsafe fn release(&self) {
        // SAFETY: the lock is held, as required by the caller
        unsafe { self.unlock() }
    }
}

/// The lock of a pool, that is not shared.
///
/// This type is not [`Sync`], so that a pool using it cannot be used from
/// multiple threads at the same time.
#[derive(Debug, Default)]
pub struct NoLock(PhantomData<Cell<()>>);
impl NoLock {
    /// Create the "lock".
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}
// SAFETY: `NoLock` is not `Sync`, so there is nothing to exclude
unsafe impl Lock for NoLock {
    fn acquire(&self) {}

    unsafe fn release(&self) {}
}

/// A lock made of two callbacks for acquiring and releasing.
///
/// This is useful to integrate an existing lock, e.g. one of an RTOS or a
/// critical section implementation. Any context needed is captured by the
/// closures:
/// ```
/// use blockpool::FnLock;
/// use core::sync::atomic::{AtomicBool, Ordering};
///
/// static LOCKED: AtomicBool = AtomicBool::new(false);
///
/// // SAFETY: the closures implement a spin lock
/// let lock = unsafe {
///     FnLock::new(
///         || while LOCKED.swap(true, Ordering::Acquire) {},
///         || LOCKED.store(false, Ordering::Release),
///     )
/// };
/// # let _ = lock;
/// ```
pub struct FnLock<A, R> {
    acquire: A,
    release: R,
}
impl<A, R> FnLock<A, R>
where
    A: Fn(),
    R: Fn(),
{
    /// Create a lock from the two callbacks.
    ///
    /// # Safety
    /// If the callbacks are [`Sync`], they have to implement mutual exclusion
    /// as described on [`Lock`].
    pub const unsafe fn new(acquire: A, release: R) -> Self {
        Self { acquire, release }
    }
}
// SAFETY: mutual exclusion is guaranteed by the caller of `FnLock::new()`
unsafe impl<A, R> Lock for FnLock<A, R>
where
    A: Fn(),
    R: Fn(),
{
    fn acquire(&self) {
        (self.acquire)();
    }

    unsafe fn release(&self) {
        (self.release)();
    }
}
impl<A, R> core::fmt::Debug for FnLock<A, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnLock").finish_non_exhaustive()
    }
}

/// A held lock, which is released when dropped.
pub(crate) struct LockGuard<'lock, L: Lock>(&'lock L);
impl<'lock, L: Lock> LockGuard<'lock, L> {
    pub(crate) fn new(lock: &'lock L) -> Self {
        lock.acquire();
        Self(lock)
    }
}
impl<L: Lock> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        // SAFETY: the lock was acquired when creating the guard
        unsafe { self.0.release() }
    }
}
