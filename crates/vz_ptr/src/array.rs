use alloc::boxed::Box;
use alloc::vec::Vec;
use core::iter;
use core::ops::{Index, IndexMut};
use core::ptr::NonNull;

use crate::deleter::Deleter;
use crate::error::AccessError;
use crate::unique::Unique;

impl<T> Unique<[T]> {
    /// Takes ownership of a boxed block.
    #[inline]
    pub fn from_boxed_slice(block: Box<[T]>) -> Self {
        Self::from_box(block)
    }

    /// Allocates a block of `len` default values.
    ///
    /// # Examples
    ///
    /// ```
    /// use vz_ptr::UniqueArray;
    ///
    /// let arr = UniqueArray::<u8>::new_with_len(3);
    /// assert_eq!(arr.as_slice(), &[0, 0, 0]);
    /// ```
    pub fn new_with_len(len: usize) -> Self
    where
        T: Default,
    {
        Self::from_boxed_slice(iter::repeat_with(T::default).take(len).collect())
    }
}

impl<T> From<Vec<T>> for Unique<[T]> {
    #[inline]
    fn from(block: Vec<T>) -> Self {
        Self::from_boxed_slice(block.into_boxed_slice())
    }
}

impl<T, D: Deleter<[T]>> Unique<[T], D> {
    /// Returns the number of elements in the block, `0` when empty.
    #[inline]
    pub fn len(&self) -> usize {
        self.as_ptr().map_or(0, |ptr| ptr.len())
    }

    /// Returns the block as a slice, or `&[]` when the handle is empty.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.as_ref().unwrap_or(&[])
    }

    /// Returns the block as a mutable slice, or `&mut []` when the handle is
    /// empty.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self.as_mut() {
            Some(block) => block,
            None => &mut [],
        }
    }

    /// Indexes the block without doing bounds checks.
    ///
    /// # Safety
    ///
    /// - The handle must own a block.
    /// - `index` must be in-bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use vz_ptr::UniqueArray;
    ///
    /// let arr = UniqueArray::from(vec![1, 2, 3, 4]);
    ///
    /// assert_eq!(unsafe { *arr.get_unchecked(2) }, 3);
    /// ```
    #[cfg_attr(debug_assertions, track_caller)]
    #[cfg_attr(not(debug_assertions), inline(always))]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        #[cfg(debug_assertions)]
        assert!(
            index < self.len(),
            "tried to index out-of-bounds of a unique array"
        );

        // SAFETY: The caller guarantees a non-empty handle and an in-bounds `index`.
        unsafe { self.element(index).as_ref() }
    }

    /// Mutable version of [`get_unchecked`](Self::get_unchecked).
    ///
    /// # Safety
    ///
    /// See [`get_unchecked`](Self::get_unchecked).
    #[cfg_attr(debug_assertions, track_caller)]
    #[cfg_attr(not(debug_assertions), inline(always))]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        #[cfg(debug_assertions)]
        assert!(
            index < self.len(),
            "tried to index out-of-bounds of a unique array"
        );

        // SAFETY: Same as `get_unchecked`, `&mut self` gives exclusive access.
        unsafe { self.element(index).as_mut() }
    }

    /// # Safety
    ///
    /// The handle must own a block.
    #[inline(always)]
    unsafe fn element(&self, index: usize) -> NonNull<T> {
        // SAFETY: Forwarded to the caller, `index` is checked by them.
        unsafe { self.as_ptr().unwrap_unchecked().cast::<T>().add(index) }
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// [`AccessError::Null`] if the handle is empty,
    /// [`AccessError::OutOfBounds`] if `index >= len`.
    pub fn try_get(&self, index: usize) -> Result<&T, AccessError> {
        let block = self.as_ref().ok_or(AccessError::Null)?;
        let len = block.len();
        block.get(index).ok_or(AccessError::OutOfBounds { index, len })
    }

    /// Mutable version of [`try_get`](Self::try_get).
    pub fn try_get_mut(&mut self, index: usize) -> Result<&mut T, AccessError> {
        let block = self.as_mut().ok_or(AccessError::Null)?;
        let len = block.len();
        block
            .get_mut(index)
            .ok_or(AccessError::OutOfBounds { index, len })
    }
}

/// # Panics
///
/// Panics if the handle is empty or `index` is out of bounds.
impl<T, D: Deleter<[T]>> Index<usize> for Unique<[T], D> {
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, index: usize) -> &T {
        match self.try_get(index) {
            Ok(elem) => elem,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T, D: Deleter<[T]>> IndexMut<usize> for Unique<[T], D> {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        match self.try_get_mut(index) {
            Ok(elem) => elem,
            Err(e) => panic!("{e}"),
        }
    }
}
