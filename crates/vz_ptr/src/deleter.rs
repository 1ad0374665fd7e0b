use alloc::boxed::Box;
use core::any::type_name;
use core::fmt;
use core::ptr::NonNull;

// -----------------------------------------------------------------------------
// Deleter

/// A destruction policy for resources owned by a [`Unique`](crate::Unique).
///
/// The handle calls [`delete`](Deleter::delete) exactly once per destroy or
/// replace event, passing whatever it held at that moment. For an array
/// handle (`K = [T]`) that is one call for the whole block, never one per
/// element.
///
/// `None` is passed when the handle was empty; implementations must accept it
/// silently.
///
/// A panic raised here is not caught by the handle. The handle has already
/// forgotten the resource when `delete` runs, so a panicking policy never
/// leads to a second release.
///
/// Only a [`Unique`](crate::Unique) is expected to call `delete`; releasing
/// arbitrary pointers from safe code is rejected:
///
/// ```compile_fail
/// use core::ptr::NonNull;
/// use vz_ptr::{DefaultDelete, Deleter};
///
/// let mut x = 5u64;
/// DefaultDelete.delete(Some(NonNull::from(&mut x)));
/// ```
///
/// # Examples
///
/// ```
/// use core::ptr::NonNull;
/// use vz_ptr::{Deleter, UniquePtr};
///
/// #[derive(Default)]
/// struct Leak;
///
/// impl<K: ?Sized> Deleter<K> for Leak {
///     unsafe fn delete(&mut self, _ptr: Option<NonNull<K>>) {}
/// }
///
/// static VALUE: u8 = 5;
/// let ptr = unsafe { UniquePtr::<u8, Leak>::from_raw(&raw const VALUE as *mut u8) };
/// assert_eq!(*ptr, 5);
/// ```
pub trait Deleter<K: ?Sized> {
    /// Releases `ptr`, which may be `None`.
    ///
    /// # Safety
    ///
    /// `ptr` must be `None` or a resource handed over by a `Unique` that owned
    /// it under the contract of [`Unique::from_raw`](crate::Unique::from_raw).
    /// It must not be used again after this call.
    unsafe fn delete(&mut self, ptr: Option<NonNull<K>>);
}

// -----------------------------------------------------------------------------
// DefaultDelete

/// Releases resources allocated through [`Box`].
///
/// For `K = T` this drops one object, for `K = [T]` it drops every element of
/// the block and frees it with a single deallocation.
///
/// Every pointer handed to a handle using this policy must come from
/// [`Box::into_raw`] (or an equivalent allocation for the same type).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefaultDelete;

impl<K: ?Sized> Deleter<K> for DefaultDelete {
    #[inline]
    unsafe fn delete(&mut self, ptr: Option<NonNull<K>>) {
        if let Some(ptr) = ptr {
            // SAFETY: The caller hands over a pointer owned under the
            // `from_raw` contract, which for `DefaultDelete` means it was
            // produced by `Box::into_raw`.
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        }
    }
}

// -----------------------------------------------------------------------------
// NoopDelete

/// A policy that never releases anything.
///
/// Useful when the handle only tracks exclusive access to memory owned
/// elsewhere, such as a `static`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoopDelete;

impl<K: ?Sized> Deleter<K> for NoopDelete {
    #[inline(always)]
    unsafe fn delete(&mut self, _ptr: Option<NonNull<K>>) {}
}

// -----------------------------------------------------------------------------
// FnDelete

/// Adapts a closure into a [`Deleter`].
///
/// # Examples
///
/// ```
/// use core::cell::Cell;
/// use vz_ptr::{FnDelete, UniquePtr};
///
/// let calls = Cell::new(0);
/// {
///     let deleter = FnDelete(|ptr: Option<core::ptr::NonNull<i32>>| {
///         if let Some(ptr) = ptr {
///             drop(unsafe { Box::from_raw(ptr.as_ptr()) });
///         }
///         calls.set(calls.get() + 1);
///     });
///     let _ptr = unsafe { UniquePtr::from_raw_with(Box::into_raw(Box::new(3)), deleter) };
/// }
/// assert_eq!(calls.get(), 1);
/// ```
#[derive(Clone, Copy)]
pub struct FnDelete<F>(pub F);

impl<K: ?Sized, F: FnMut(Option<NonNull<K>>)> Deleter<K> for FnDelete<F> {
    #[inline]
    unsafe fn delete(&mut self, ptr: Option<NonNull<K>>) {
        // The closure is safe to call; its body owns the release logic.
        (self.0)(ptr);
    }
}

impl<F> fmt::Debug for FnDelete<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnDelete(..)")
    }
}

// -----------------------------------------------------------------------------
// LogDelete

/// Emits a `trace` record for every invocation, then forwards to `D`.
///
/// ```
/// use vz_ptr::{DefaultDelete, LogDelete, UniquePtr};
///
/// let value = Box::into_raw(Box::new(String::from("traced")));
/// let ptr: UniquePtr<String, LogDelete<DefaultDelete>> = unsafe { UniquePtr::from_raw(value) };
/// assert_eq!(ptr.as_str(), "traced");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogDelete<D = DefaultDelete> {
    inner: D,
}

impl<D> LogDelete<D> {
    /// Wraps `inner`.
    #[inline]
    pub const fn new(inner: D) -> Self {
        Self { inner }
    }

    /// Returns a reference to the wrapped policy.
    #[inline]
    pub const fn inner(&self) -> &D {
        &self.inner
    }

    /// Unwraps the policy.
    #[inline]
    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<K: ?Sized, D: Deleter<K>> Deleter<K> for LogDelete<D> {
    unsafe fn delete(&mut self, ptr: Option<NonNull<K>>) {
        match ptr {
            Some(ptr) => log::trace!("releasing `{}` at {ptr:p}", type_name::<K>()),
            None => log::trace!("releasing an empty `{}` handle", type_name::<K>()),
        }
        // SAFETY: Forwarded from our caller unchanged.
        unsafe { self.inner.delete(ptr) };
    }
}
