use alloc::boxed::Box;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;

use crate::deleter::{DefaultDelete, Deleter};

// -----------------------------------------------------------------------------
// OwnState

/// Whether a [`Unique`] currently owns a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnState {
    /// The handle holds no resource.
    Empty,
    /// The handle holds a resource and will release it.
    Owning,
}

// -----------------------------------------------------------------------------
// Unique

/// An exclusive owner of one resource, released through a [`Deleter`].
///
/// `K` is the owned kind: a sized `T` for a single object (see
/// [`UniquePtr`](crate::UniquePtr)) or `[T]` for a fixed-size block (see
/// [`UniqueArray`](crate::UniqueArray)). Both kinds share every method of this
/// block; they differ only in their access surface.
///
/// # Ownership
///
/// - It cannot be cloned. Ownership only moves, either by a Rust move or by
///   [`take`](Self::take) / [`assign_from`](Self::assign_from), which leave the
///   source empty.
/// - The deleter runs exactly once per destroy or replace event: on drop, on
///   [`reset`](Self::reset), and on the target of [`assign_from`](Self::assign_from).
/// - [`release`](Self::release) gives the resource back without running the
///   deleter.
///
/// The handle forgets its resource *before* calling the deleter, so a
/// deleter that panics cannot cause a double release.
pub struct Unique<K: ?Sized, D: Deleter<K> = DefaultDelete> {
    ptr: Option<NonNull<K>>,
    deleter: D,
    _marker: PhantomData<K>,
}

// SAFETY: `Unique` owns its pointee like `Box` does, there is no aliasing.
unsafe impl<K: ?Sized + Send, D: Deleter<K> + Send> Send for Unique<K, D> {}

// SAFETY: Shared access only hands out `&K` and `&D`.
unsafe impl<K: ?Sized + Sync, D: Deleter<K> + Sync> Sync for Unique<K, D> {}

impl<K: ?Sized, D: Deleter<K>> Drop for Unique<K, D> {
    fn drop(&mut self) {
        let ptr = self.ptr.take();
        // SAFETY: The resource was owned under the `from_raw` contract and the
        // handle no longer refers to it.
        unsafe { self.deleter.delete(ptr) };
    }
}

impl<K: ?Sized, D: Deleter<K> + Default> Default for Unique<K, D> {
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl<K: ?Sized, D: Deleter<K> + Default> Unique<K, D> {
    /// Creates an empty handle with a default deleter.
    ///
    /// # Examples
    ///
    /// ```
    /// use vz_ptr::UniquePtr;
    ///
    /// let ptr = UniquePtr::<i32>::null();
    /// assert!(ptr.is_null());
    /// ```
    #[inline]
    pub fn null() -> Self {
        Self::null_with(D::default())
    }

    /// Takes ownership of `ptr` with a default deleter.
    ///
    /// A null `ptr` produces an empty handle. The deleter is not invoked.
    ///
    /// # Safety
    ///
    /// - If non-null, `ptr` must be valid for reads and writes of `K` for as
    ///   long as the handle owns it.
    /// - `ptr` must be something the deleter can release, e.g. the result of
    ///   [`Box::into_raw`] for [`DefaultDelete`].
    /// - No other owner may release `ptr`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vz_ptr::UniquePtr;
    ///
    /// let raw = Box::into_raw(Box::new(8));
    /// let ptr = unsafe { UniquePtr::<i32>::from_raw(raw) };
    /// assert_eq!(*ptr, 8);
    /// ```
    #[inline]
    pub unsafe fn from_raw(ptr: *mut K) -> Self {
        // SAFETY: Forwarded to the caller.
        unsafe { Self::from_raw_with(ptr, D::default()) }
    }

    /// Transfers the resource and the deleter into a new handle.
    ///
    /// `self` is left empty with a default deleter. No deleter is invoked.
    ///
    /// # Examples
    ///
    /// ```
    /// use vz_ptr::UniquePtr;
    ///
    /// let mut a = UniquePtr::new(8);
    /// let b = a.take();
    ///
    /// assert!(a.is_null());
    /// assert_eq!(*b, 8);
    /// ```
    #[inline]
    pub fn take(&mut self) -> Self {
        let ptr = self.ptr.take();
        trace_handle!("unique handle transferred out {ptr:?}");
        Self {
            ptr,
            deleter: mem::take(&mut self.deleter),
            _marker: PhantomData,
        }
    }
}

impl<K: ?Sized, D: Deleter<K>> Unique<K, D> {
    /// Creates an empty handle with the given deleter.
    #[inline]
    pub const fn null_with(deleter: D) -> Self {
        Self {
            ptr: None,
            deleter,
            _marker: PhantomData,
        }
    }

    /// Takes ownership of `ptr`, released later by `deleter`.
    ///
    /// # Safety
    ///
    /// See [`from_raw`](Self::from_raw).
    #[inline]
    pub unsafe fn from_raw_with(ptr: *mut K, deleter: D) -> Self {
        Self {
            ptr: NonNull::new(ptr),
            deleter,
            _marker: PhantomData,
        }
    }

    /// Moves the resource of `other` into `self`.
    ///
    /// The deleter of `self` is invoked once on the resource `self` held
    /// before, then `self` adopts the resource and deleter of `other`, and
    /// `other` is left empty.
    ///
    /// If both handles are empty this does nothing. Handing the same handle
    /// as both arguments is rejected by the borrow checker, so a
    /// self-transfer can never release a live resource.
    ///
    /// # Examples
    ///
    /// ```
    /// use vz_ptr::UniquePtr;
    ///
    /// let mut a = UniquePtr::new(1);
    /// let mut b = UniquePtr::new(2);
    ///
    /// a.assign_from(&mut b);
    ///
    /// assert_eq!(*a, 2);
    /// assert!(b.is_null());
    /// ```
    pub fn assign_from(&mut self, other: &mut Self) {
        if self.ptr.is_none() && other.ptr.is_none() {
            return;
        }
        trace_handle!("unique handle {:?} assigned from {:?}", self.ptr, other.ptr);
        // `other` now holds the old resource with the deleter that owns it.
        mem::swap(self, other);
        other.reset();
    }

    /// Gives up ownership and returns the resource without invoking the
    /// deleter.
    ///
    /// The caller becomes responsible for releasing it.
    ///
    /// # Examples
    ///
    /// ```
    /// use vz_ptr::UniquePtr;
    ///
    /// let mut ptr = UniquePtr::new(8);
    /// let raw = ptr.release().unwrap();
    /// assert!(ptr.is_null());
    ///
    /// let value = unsafe { Box::from_raw(raw.as_ptr()) };
    /// assert_eq!(*value, 8);
    /// ```
    #[inline]
    #[must_use = "the released resource leaks if it is not used"]
    pub fn release(&mut self) -> Option<NonNull<K>> {
        let ptr = self.ptr.take();
        trace_handle!("unique handle released {ptr:?}");
        ptr
    }

    /// Invokes the deleter on the current resource and leaves the handle
    /// empty.
    ///
    /// The deleter runs on every call, receiving `None` when the handle is
    /// already empty.
    #[inline]
    pub fn reset(&mut self) {
        self.replace_raw(None);
    }

    /// Invokes the deleter on the current resource, then takes ownership of
    /// `ptr`.
    ///
    /// # Safety
    ///
    /// See [`from_raw`](Self::from_raw). In addition `ptr` must not be the
    /// resource currently owned by `self`.
    #[inline]
    pub unsafe fn reset_to(&mut self, ptr: *mut K) {
        self.replace_raw(NonNull::new(ptr));
    }

    fn replace_raw(&mut self, ptr: Option<NonNull<K>>) {
        let old = mem::replace(&mut self.ptr, ptr);
        trace_handle!("unique handle reset {old:?} -> {:?}", self.ptr);
        // SAFETY: `old` was owned under the `from_raw` contract and has just
        // been detached from the handle.
        unsafe { self.deleter.delete(old) };
    }

    /// Exchanges resources and deleters with `other`.
    ///
    /// No deleter is invoked.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Returns the owned resource without giving up ownership.
    #[inline]
    pub const fn as_ptr(&self) -> Option<NonNull<K>> {
        self.ptr
    }

    /// Returns a shared reference to the resource, if any.
    #[inline]
    pub fn as_ref(&self) -> Option<&K> {
        // SAFETY: An owned pointer is valid for reads while `self` lives.
        self.ptr.map(|ptr| unsafe { ptr.as_ref() })
    }

    /// Returns a mutable reference to the resource, if any.
    #[inline]
    pub fn as_mut(&mut self) -> Option<&mut K> {
        // SAFETY: An owned pointer is valid for writes and `&mut self`
        // guarantees exclusive access.
        self.ptr.map(|mut ptr| unsafe { ptr.as_mut() })
    }

    /// Returns `true` if the handle owns a resource.
    #[inline]
    pub const fn is_owning(&self) -> bool {
        self.ptr.is_some()
    }

    /// Returns `true` if the handle is empty.
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    /// Returns the current [`OwnState`].
    #[inline]
    pub const fn state(&self) -> OwnState {
        match self.ptr {
            Some(_) => OwnState::Owning,
            None => OwnState::Empty,
        }
    }

    /// Returns a reference to the deleter.
    #[inline]
    pub const fn deleter(&self) -> &D {
        &self.deleter
    }

    /// Returns a mutable reference to the deleter.
    #[inline]
    pub fn deleter_mut(&mut self) -> &mut D {
        &mut self.deleter
    }
}

// -----------------------------------------------------------------------------
// Box interop

impl<K: ?Sized> Unique<K> {
    /// Takes ownership of a boxed resource.
    #[inline]
    pub fn from_box(value: Box<K>) -> Self {
        // SAFETY: `Box::into_raw` is exactly what `DefaultDelete` releases.
        unsafe { Self::from_raw(Box::into_raw(value)) }
    }

    /// Gives up ownership as a `Box`, or `None` if the handle is empty.
    #[inline]
    pub fn into_box(mut self) -> Option<Box<K>> {
        // SAFETY: The resource came from `Box::into_raw`, see `from_raw`.
        self.release()
            .map(|ptr| unsafe { Box::from_raw(ptr.as_ptr()) })
    }
}

impl<K: ?Sized> From<Box<K>> for Unique<K> {
    #[inline]
    fn from(value: Box<K>) -> Self {
        Self::from_box(value)
    }
}

// -----------------------------------------------------------------------------
// Formatting

impl<K: ?Sized, D: Deleter<K>> fmt::Pointer for Unique<K, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ptr {
            Some(ptr) => fmt::Pointer::fmt(&ptr, f),
            None => f.write_str("null"),
        }
    }
}

impl<K: ?Sized, D: Deleter<K>> fmt::Debug for Unique<K, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unique(")?;
        fmt::Pointer::fmt(self, f)?;
        f.write_str(")")
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{OwnState, Unique};
    use crate::{DefaultDelete, Deleter, FnDelete, LogDelete, NoopDelete};
    use alloc::boxed::Box;
    use alloc::string::String;
    use core::cell::Cell;
    use core::panic::AssertUnwindSafe;
    use core::ptr::NonNull;
    use std::panic;

    /// Counts every deleter call, empty ones included, and frees boxes.
    ///
    /// The default instance frees without counting.
    #[derive(Default)]
    struct Counting<'a>(Option<&'a Counters>);

    impl<K: ?Sized> Deleter<K> for Counting<'_> {
        unsafe fn delete(&mut self, ptr: Option<NonNull<K>>) {
            if let Some(counters) = self.0 {
                counters.calls.set(counters.calls.get() + 1);
                if ptr.is_some() {
                    counters.released.set(counters.released.get() + 1);
                }
            }
            // SAFETY: Forwarded from the owning handle unchanged.
            unsafe { DefaultDelete.delete(ptr) };
        }
    }

    struct Counters {
        calls: Cell<usize>,
        released: Cell<usize>,
    }

    impl Counters {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
                released: Cell::new(0),
            }
        }

        fn deleter(&self) -> Counting<'_> {
            Counting(Some(self))
        }

        fn handle<T>(&self, value: T) -> Unique<T, Counting<'_>> {
            // SAFETY: Freshly boxed, and `Counting` frees through `DefaultDelete`.
            unsafe { Unique::from_raw_with(Box::into_raw(Box::new(value)), self.deleter()) }
        }
    }

    /// Increments a shared counter when dropped.
    struct Tracked<'a>(i32, &'a Cell<usize>);

    impl Drop for Tracked<'_> {
        fn drop(&mut self) {
            self.1.set(self.1.get() + 1);
        }
    }

    #[test]
    fn is_sync_send() {
        use core::panic::{RefUnwindSafe, UnwindSafe};

        fn is_send<T: Send>() {}
        fn is_sync<T: Sync>() {}
        fn is_unwindsafe<T: UnwindSafe>() {}
        fn is_refunwindsafe<T: RefUnwindSafe>() {}

        is_send::<Unique<i32>>();
        is_sync::<Unique<i32>>();
        is_send::<Unique<[i32]>>();
        is_sync::<Unique<[i32]>>();
        is_unwindsafe::<Unique<i32>>();
        is_refunwindsafe::<Unique<i32>>();
    }

    #[test]
    fn scoped_handles_release_once_each() {
        let counters = Counters::new();
        {
            let _a = counters.handle(8);
            let _b = counters.handle(8);
            let _c = counters.handle(8);
        }
        assert_eq!(counters.released.get(), 3);
        assert_eq!(counters.calls.get(), 3);
    }

    #[test]
    fn empty_handles() {
        let def = Unique::<i32>::null();
        assert!(def.is_null());
        assert!(!def.is_owning());
        assert_eq!(def.state(), OwnState::Empty);
        assert!(def.as_ptr().is_none());

        // SAFETY: A null pointer yields an empty handle.
        let def2 = unsafe { Unique::<i32>::from_raw(core::ptr::null_mut()) };
        assert!(def2.is_null());

        let def3: Unique<[i32]> = Unique::default();
        assert!(def3.is_null());
    }

    #[test]
    fn empty_drop_calls_deleter_with_none() {
        let counters = Counters::new();
        drop(Unique::<i32, _>::null_with(counters.deleter()));
        assert_eq!(counters.calls.get(), 1);
        assert_eq!(counters.released.get(), 0);
    }

    #[test]
    fn take_transfers_without_release() {
        let counters = Counters::new();
        let mut val = counters.handle(8);
        let moved = val.take();
        assert_eq!(counters.calls.get(), 0);

        assert!(val.is_null());
        assert!(moved.is_owning());
        assert_eq!(moved.state(), OwnState::Owning);
        assert_eq!(*moved, 8);
        // SAFETY: `moved` owns a live `i32`.
        assert_eq!(unsafe { *moved.as_ptr().unwrap().as_ptr() }, 8);

        drop(moved);
        assert_eq!(counters.calls.get(), 1);
        assert_eq!(counters.released.get(), 1);

        // The source kept a default, non-counting deleter.
        drop(val);
        assert_eq!(counters.calls.get(), 1);
    }

    #[test]
    fn take_carries_deleter() {
        /// Boxed release, tagged so tests can tell instances apart.
        #[derive(Default)]
        struct Tagged(u8);

        impl<K: ?Sized> Deleter<K> for Tagged {
            unsafe fn delete(&mut self, ptr: Option<NonNull<K>>) {
                // SAFETY: Forwarded from the owning handle unchanged.
                unsafe { DefaultDelete.delete(ptr) };
            }
        }

        // SAFETY: Freshly boxed, `Tagged` frees through `DefaultDelete`.
        let mut a = unsafe { Unique::from_raw_with(Box::into_raw(Box::new(1)), Tagged(7)) };
        let b = a.take();

        assert!(a.is_null());
        assert_eq!(a.deleter().0, 0);
        assert_eq!(b.deleter().0, 7);
        assert_eq!(*b, 1);
    }

    #[test]
    fn assign_from_releases_target_once() {
        let counters = Counters::new();
        let mut h1 = counters.handle(1);
        let mut h2 = counters.handle(2);

        h1.assign_from(&mut h2);
        assert_eq!(counters.released.get(), 1);
        assert_eq!(counters.calls.get(), 1);
        assert_eq!(*h1, 2);
        assert!(h2.is_null());

        h2.assign_from(&mut h1);
        assert_eq!(counters.released.get(), 1);
        assert_eq!(counters.calls.get(), 2);
        assert_eq!(*h2, 2);
        assert!(h1.is_null());
    }

    #[test]
    fn assign_from_between_empty_handles_is_noop() {
        let counters = Counters::new();
        let mut a = Unique::<i32, _>::null_with(counters.deleter());
        let mut b = Unique::<i32, _>::null_with(counters.deleter());

        a.assign_from(&mut b);
        assert_eq!(counters.calls.get(), 0);
    }

    #[test]
    fn assign_from_adopts_other_deleter() {
        let first = Counters::new();
        let second = Counters::new();
        let mut a = first.handle(1);
        let mut b = second.handle(2);

        a.assign_from(&mut b);
        assert_eq!(first.released.get(), 1);
        assert_eq!(second.released.get(), 0);

        drop(a);
        assert_eq!(second.released.get(), 1);
    }

    #[test]
    fn move_assignment_roundtrip() {
        let mut val = Unique::new(8);
        let mut moved = val.take();
        assert!(val.is_null());

        val.assign_from(&mut moved);
        assert!(moved.is_null());
        assert!(val.is_owning());
        assert_eq!(*val, 8);
    }

    #[test]
    fn release_skips_deleter() {
        let drops = Cell::new(0);
        {
            let mut val = Unique::new(Tracked(8, &drops));
            assert_eq!(val.0, 8);

            let raw = val.release().unwrap();
            assert!(val.is_null());
            assert_eq!(drops.get(), 0);

            // SAFETY: `release` handed back the pointer from `Box::into_raw`.
            drop(unsafe { Box::from_raw(raw.as_ptr()) });
            assert_eq!(drops.get(), 1);
        }
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn released_resource_can_be_readopted() {
        let drops = Cell::new(0);
        let raw;
        {
            let mut val = Unique::new(Tracked(8, &drops));
            raw = val.release().unwrap();
        }
        assert_eq!(drops.get(), 0);
        // SAFETY: The released value is still alive and unaliased.
        assert_eq!(unsafe { raw.as_ref() }.0, 8);
        {
            // SAFETY: `raw` came from a `DefaultDelete` handle and nobody owns it.
            let val = unsafe { Unique::<Tracked<'_>>::from_raw(raw.as_ptr()) };
            assert_eq!(val.0, 8);
            assert_eq!(drops.get(), 0);
        }
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn repeated_reset_never_double_frees() {
        let drops = Cell::new(0);
        {
            let mut val = Unique::new(Tracked(8, &drops));
            let raw = val.release().unwrap();
            assert!(val.is_null());

            val.reset();
            val.reset();
            assert_eq!(drops.get(), 0);

            // SAFETY: `raw` was released above and is owned by nobody.
            unsafe { val.reset_to(raw.as_ptr()) };
            assert!(val.is_owning());
            assert_eq!(val.0, 8);
            assert_eq!(val.as_ref().unwrap().0, 8);
        }
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn reset_invokes_deleter_every_call() {
        let counters = Counters::new();
        let mut val = counters.handle(5);

        val.reset();
        assert_eq!(counters.calls.get(), 1);
        assert_eq!(counters.released.get(), 1);

        val.reset();
        assert_eq!(counters.calls.get(), 2);
        assert_eq!(counters.released.get(), 1);
    }

    #[test]
    fn reset_to_replaces_resource() {
        let drops = Cell::new(0);
        let mut val = Unique::new(Tracked(1, &drops));

        // SAFETY: Freshly boxed, distinct from the current resource.
        unsafe { val.reset_to(Box::into_raw(Box::new(Tracked(2, &drops)))) };
        assert_eq!(drops.get(), 1);
        assert_eq!(val.0, 2);

        drop(val);
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn swap_exchanges_without_release() {
        let counters = Counters::new();
        let mut a = counters.handle(9);
        let mut b = counters.handle(40);

        a.swap(&mut b);
        assert_eq!(*a, 40);
        assert_eq!(*b, 9);
        assert_eq!(counters.calls.get(), 0);

        core::mem::swap(&mut a, &mut b);
        assert_eq!(*a, 9);
        assert_eq!(*b, 40);
        assert_eq!(counters.calls.get(), 0);
    }

    #[test]
    fn swap_with_empty() {
        let mut a = Unique::new(3);
        let mut b = Unique::null();

        a.swap(&mut b);
        assert!(a.is_null());
        assert_eq!(*b, 3);
    }

    #[test]
    fn panicking_deleter_propagates_and_forgets() {
        let calls = Cell::new(0);
        let deleter = FnDelete(|ptr: Option<NonNull<i32>>| {
            calls.set(calls.get() + 1);
            if let Some(ptr) = ptr {
                // SAFETY: Only the handle below calls this, with its boxed `i32`.
                drop(unsafe { Box::from_raw(ptr.as_ptr()) });
                panic!("deleter failed");
            }
        });
        // SAFETY: Freshly boxed, released by the closure above.
        let mut val = unsafe { Unique::from_raw_with(Box::into_raw(Box::new(7)), deleter) };

        let result = panic::catch_unwind(AssertUnwindSafe(|| val.reset()));
        assert!(result.is_err());
        assert!(val.is_null());
        assert_eq!(calls.get(), 1);

        drop(val);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn box_interop() {
        let val: Unique<String> = Box::new(String::from("boxed")).into();
        assert_eq!(val.as_str(), "boxed");

        let boxed = val.into_box().unwrap();
        assert_eq!(*boxed, "boxed");

        assert!(Unique::<i32>::null().into_box().is_none());
    }

    #[test]
    fn noop_and_log_deleters() {
        static VALUE: i32 = 11;
        // SAFETY: `NoopDelete` never frees and the handle only reads.
        let ptr = unsafe { Unique::<i32, NoopDelete>::from_raw(&raw const VALUE as *mut i32) };
        assert_eq!(*ptr, 11);
        drop(ptr);

        // SAFETY: Freshly boxed, `LogDelete` forwards to `DefaultDelete`.
        let mut logged: Unique<i32, LogDelete> =
            unsafe { Unique::from_raw(Box::into_raw(Box::new(4))) };
        assert_eq!(*logged, 4);
        logged.reset();
        logged.reset();
        assert!(logged.is_null());
    }

    #[test]
    fn assign_from_transfers_between_zero_sized_resources() {
        let counters = Counters::new();
        let mut a = counters.handle(());
        let mut b = counters.handle(());
        assert_eq!(a.as_ptr(), b.as_ptr());

        a.assign_from(&mut b);
        assert_eq!(counters.calls.get(), 1);
        assert_eq!(counters.released.get(), 1);
        assert!(a.is_owning());
        assert!(b.is_null());

        drop(a);
        assert_eq!(counters.released.get(), 2);
    }

    #[test]
    fn formatting() {
        let empty = Unique::<i32>::null();
        assert_eq!(alloc::format!("{empty:?}"), "Unique(null)");

        let owning = Unique::new(1);
        let expected = alloc::format!("Unique({:p})", owning.as_ptr().unwrap());
        assert_eq!(alloc::format!("{owning:?}"), expected);
    }
}
