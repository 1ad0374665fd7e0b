#![doc = include_str!("../README.md")]
#![expect(unsafe_code, reason = "Owning raw pointers is inherently unsafe.")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

extern crate alloc;

#[cfg(test)]
extern crate std;

// -----------------------------------------------------------------------------
// Internal macros

/// Traces a handle transition when the `debug` feature is enabled.
///
/// Expands to nothing in release builds.
macro_rules! trace_handle {
    ($($arg:tt)*) => {
        #[cfg(all(feature = "debug", debug_assertions))]
        log::trace!($($arg)*);
    };
}

// -----------------------------------------------------------------------------
// Modules

mod array;
mod deleter;
mod error;
mod scalar;
mod unique;

// -----------------------------------------------------------------------------
// Top-level exports

pub use deleter::{DefaultDelete, Deleter, FnDelete, LogDelete, NoopDelete};
pub use error::AccessError;
pub use unique::{OwnState, Unique};

/// An exclusive owner of a single `T`.
///
/// Provides `Deref` / `DerefMut` access.
pub type UniquePtr<T, D = DefaultDelete> = Unique<T, D>;

/// An exclusive owner of a fixed-size block of `T`.
///
/// Provides indexed element access instead of `Deref`.
pub type UniqueArray<T, D = DefaultDelete> = Unique<[T], D>;
