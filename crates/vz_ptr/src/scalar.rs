use alloc::boxed::Box;
use core::ops::{Deref, DerefMut};

use crate::deleter::Deleter;
use crate::error::AccessError;
use crate::unique::Unique;

impl<T> Unique<T> {
    /// Allocates `value` on the heap and takes ownership of it.
    ///
    /// # Examples
    ///
    /// ```
    /// use vz_ptr::UniquePtr;
    ///
    /// let ptr = UniquePtr::new(8);
    /// assert_eq!(*ptr, 8);
    /// ```
    #[inline]
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }
}

impl<T, D: Deleter<T>> Unique<T, D> {
    /// Returns the owned object, or [`AccessError::Null`] if the handle is
    /// empty.
    #[inline]
    pub fn try_deref(&self) -> Result<&T, AccessError> {
        self.as_ref().ok_or(AccessError::Null)
    }

    /// Mutable version of [`try_deref`](Self::try_deref).
    #[inline]
    pub fn try_deref_mut(&mut self) -> Result<&mut T, AccessError> {
        self.as_mut().ok_or(AccessError::Null)
    }
}

/// # Panics
///
/// Panics if the handle is empty.
impl<T, D: Deleter<T>> Deref for Unique<T, D> {
    type Target = T;

    #[inline]
    #[track_caller]
    fn deref(&self) -> &T {
        match self.as_ref() {
            Some(value) => value,
            None => panic!("dereferenced an empty unique pointer"),
        }
    }
}

impl<T, D: Deleter<T>> DerefMut for Unique<T, D> {
    #[inline]
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        match self.as_mut() {
            Some(value) => value,
            None => panic!("dereferenced an empty unique pointer"),
        }
    }
}
