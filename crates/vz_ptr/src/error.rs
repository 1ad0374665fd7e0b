use thiserror::Error;

// -----------------------------------------------------------------------------
// Error

/// Error returned by the checked accessors of [`Unique`](crate::Unique).
///
/// The unchecked and panicking accessors never produce it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccessError {
    #[error("the handle does not own a resource")]
    Null,

    #[error("index {index} is out of bounds for a block of length {len}")]
    OutOfBounds { index: usize, len: usize },
}
