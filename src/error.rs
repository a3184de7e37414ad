//! The error type shared by all pool operations.

/// An error reported by a [`Pool`](crate::Pool) operation.
///
/// Every operation of this crate reports failures through this type instead
/// of panicking, since a memory pool is frequently used in places where
/// unwinding is not an option. None of the errors leaves the pool in an
/// inconsistent state: the pool is usable (and unchanged) afterwards.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// A required pointer was null or a one-time binding happened twice.
    #[error("{}", self.as_str())]
    InvalidArgument,
    /// A size parameter was zero, the block is too small to host a free-list
    /// link or no block fits into the buffer.
    #[error("{}", self.as_str())]
    InvalidSize,
    /// The alignment is not a power of two or the buffer does not start at an
    /// address aligned to it.
    #[error("{}", self.as_str())]
    Alignment,
    /// There is no free block left.
    #[error("{}", self.as_str())]
    OutOfMemory,
    /// The pointer is not the start of a block of this pool.
    #[error("{}", self.as_str())]
    InvalidBlock,
    /// The block is already free. This is also reported for pointers, which
    /// look like valid blocks but were never handed out.
    #[error("{}", self.as_str())]
    DoubleFree,
    /// The pool was used before it was bound to a buffer.
    #[error("{}", self.as_str())]
    NotInitialized,
}
impl Error {
    /// Obtain the static, human readable description of this error.
    ///
    /// This is the same text as the one produced by the [`Display`]
    /// implementation, but usable without any formatting machinery, e.g. for
    /// writing it to a serial port directly.
    ///
    /// [`Display`]: core::fmt::Display
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid argument",
            Self::InvalidSize => "invalid size",
            Self::Alignment => "alignment error",
            Self::OutOfMemory => "out of memory",
            Self::InvalidBlock => "invalid block",
            Self::DoubleFree => "double free detected",
            Self::NotInitialized => "pool not initialized",
        }
    }
}
