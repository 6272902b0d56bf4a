//! The sparse array handle and its backing block.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop};
use std::ptr::{self, NonNull};

use crate::bits::{self, Slots, MAX_SLOTS};
use crate::error::{Result, SparseArrayError};
use crate::iter::{IntoIter, Iter, IterMut};
use crate::layout::{self, Header};

/// A sparse array of up to 64 slots behind a single thin pointer.
///
/// The handle is one word. It owns one heap block holding the occupancy
/// bitmap followed by exactly `bitmap.count_ones()` values, stored densely in
/// ascending slot order. Occupancy is fixed for the lifetime of the block;
/// changing it means building a new array (see [`SparseArray::into_parts`]).
pub struct SparseArray<T> {
    header: NonNull<Header>,
    _marker: PhantomData<T>,
}

// SAFETY: the block is uniquely owned, exactly like `Box<[T]>`.
unsafe impl<T: Send> Send for SparseArray<T> {}
// SAFETY: shared access only hands out `&T`.
unsafe impl<T: Sync> Sync for SparseArray<T> {}

/// Frees a block on drop without touching its values.
struct RawBlock {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Drop for RawBlock {
    fn drop(&mut self) {
        // SAFETY: `ptr` was returned by `alloc(layout)` and is freed once.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

/// A block whose first `initialized` values have been written.
///
/// Dropping it drops those values and frees the block, which is what happens
/// when a value iterator panics or comes up short mid-construction.
struct PartialInit<T> {
    // Only held for its `Drop`.
    _block: RawBlock,
    values: *mut T,
    initialized: usize,
}

impl<T> Drop for PartialInit<T> {
    fn drop(&mut self) {
        // SAFETY: exactly `initialized` values were written starting at `values`.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.values,
                self.initialized,
            ))
        }
        // `_block` is released after this.
    }
}

#[track_caller]
#[inline]
fn check_slot(slot: u32) {
    if slot >= MAX_SLOTS {
        panic!("{}", SparseArrayError::SlotOutOfRange { slot });
    }
}

impl<T> SparseArray<T> {
    /// Build an array from an occupancy bitmap and the values of its occupied
    /// slots, given in ascending slot order.
    ///
    /// Fails with [`SparseArrayError::LengthMismatch`] when the number of values
    /// differs from `bitmap.count_ones()`. The count is checked before
    /// anything is allocated. An iterator that misreports its length is caught
    /// while writing; the values taken so far are dropped and the block freed.
    ///
    /// Allocation failure is fatal and goes through
    /// [`handle_alloc_error`](std::alloc::handle_alloc_error).
    pub fn from_bitmap_and_values<I>(bitmap: u64, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let len = bits::popcount(bitmap);
        let mut values = values.into_iter();
        if values.len() != len {
            log::debug!(
                "rejecting sparse array: bitmap {bitmap:#x} needs {len} values, got {}",
                values.len()
            );
            return Err(SparseArrayError::LengthMismatch {
                expected: len,
                actual: values.len(),
            });
        }

        let block_layout = layout::array_layout::<T>(len).inspect_err(|e| {
            log::debug!("rejecting sparse array: {e}");
        })?;
        // SAFETY: the layout includes the header, so its size is non-zero.
        let raw = unsafe { alloc(block_layout) };
        let Some(ptr) = NonNull::new(raw) else {
            handle_alloc_error(block_layout);
        };
        let header = ptr.cast::<Header>();
        // SAFETY: fresh block, aligned for `Header` at offset zero.
        unsafe { header.as_ptr().write(Header { bitmap }) };

        let mut guard = PartialInit {
            _block: RawBlock {
                ptr,
                layout: block_layout,
            },
            // SAFETY: the block was allocated with `array_layout::<T>`.
            values: unsafe { layout::values_ptr::<T>(header) },
            initialized: 0,
        };
        while guard.initialized < len {
            let Some(value) = values.next() else {
                log::debug!(
                    "value iterator ended after {} of {len} values",
                    guard.initialized
                );
                return Err(SparseArrayError::LengthMismatch {
                    expected: len,
                    actual: guard.initialized,
                });
            };
            // SAFETY: `initialized < len`, so the slot is inside the tail and
            // has not been written yet.
            unsafe { guard.values.add(guard.initialized).write(value) };
            guard.initialized += 1;
        }
        if values.next().is_some() {
            log::debug!("value iterator yielded more than the {len} values it reported");
            return Err(SparseArrayError::LengthMismatch {
                expected: len,
                actual: len + 1,
            });
        }

        // Fully initialized: ownership of the block moves to the handle.
        mem::forget(guard);
        Ok(Self {
            header,
            _marker: PhantomData,
        })
    }

    /// An array with no occupied slots. Still backed by a header-only block.
    pub fn empty() -> Self {
        match Self::from_bitmap_and_values(0, std::iter::empty()) {
            Ok(array) => array,
            Err(e) => unreachable!("empty sparse array rejected: {e}"),
        }
    }

    /// Alias for [`SparseArray::empty`].
    #[inline]
    pub fn new() -> Self {
        Self::empty()
    }

    #[inline]
    fn header(&self) -> &Header {
        // SAFETY: the header is written before the handle exists and lives
        // until `drop`.
        unsafe { self.header.as_ref() }
    }

    /// The occupancy bitmap. Bit `i` is set iff slot `i` holds a value.
    #[inline]
    pub fn bitmap(&self) -> u64 {
        self.header().bitmap
    }

    /// Number of stored values, `bitmap().count_ones()`.
    #[inline]
    pub fn len(&self) -> usize {
        bits::popcount(self.bitmap())
    }

    /// Whether no slot is occupied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bitmap() == 0
    }

    /// Whether `slot` is occupied.
    ///
    /// # Panics
    ///
    /// If `slot >= 64`. Use [`try_get`](Self::try_get) to get an error instead.
    #[track_caller]
    #[inline]
    pub fn contains(&self, slot: u32) -> bool {
        check_slot(slot);
        self.bitmap() & bits::slot_bit(slot) != 0
    }

    /// Position of `slot`'s value in [`values`](Self::values), or `None` if the
    /// slot is empty.
    ///
    /// # Panics
    ///
    /// If `slot >= 64`. Use [`try_get`](Self::try_get) to get an error instead.
    #[track_caller]
    #[inline]
    pub fn physical_index(&self, slot: u32) -> Option<usize> {
        if self.contains(slot) {
            Some(bits::rank(self.bitmap(), slot))
        } else {
            None
        }
    }

    #[inline]
    fn values_ptr(&self) -> *mut T {
        // SAFETY: the block was allocated with `array_layout::<T>`.
        unsafe { layout::values_ptr::<T>(self.header) }
    }

    /// The stored values in ascending slot order.
    #[inline]
    pub fn values(&self) -> &[T] {
        // SAFETY: the tail holds exactly `len()` initialized values, borrowed
        // for as long as `self`.
        unsafe { std::slice::from_raw_parts(self.values_ptr(), self.len()) }
    }

    /// The stored values, mutably. Occupancy cannot change through this view.
    #[inline]
    pub fn values_mut(&mut self) -> &mut [T] {
        // SAFETY: as in `values`, and `&mut self` makes the borrow unique.
        unsafe { std::slice::from_raw_parts_mut(self.values_ptr(), self.len()) }
    }

    /// Value in `slot`, or `None` if the slot is empty.
    ///
    /// # Panics
    ///
    /// If `slot >= 64`. Use [`try_get`](Self::try_get) to get an error instead.
    #[track_caller]
    #[inline]
    pub fn get(&self, slot: u32) -> Option<&T> {
        let idx = self.physical_index(slot)?;
        debug_assert!(idx < self.len());
        // SAFETY: `idx` counts the set bits below an occupied slot, so it is
        // below `len()`.
        Some(unsafe { self.values().get_unchecked(idx) })
    }

    /// Mutable value in `slot`, or `None` if the slot is empty.
    ///
    /// # Panics
    ///
    /// If `slot >= 64`. Use [`try_get_mut`](Self::try_get_mut) to get an error
    /// instead.
    #[track_caller]
    #[inline]
    pub fn get_mut(&mut self, slot: u32) -> Option<&mut T> {
        let idx = self.physical_index(slot)?;
        debug_assert!(idx < self.len());
        // SAFETY: see `get`.
        Some(unsafe { self.values_mut().get_unchecked_mut(idx) })
    }

    /// Like [`get`](Self::get), but reports an out-of-range slot as an error.
    pub fn try_get(&self, slot: u32) -> Result<Option<&T>> {
        if slot >= MAX_SLOTS {
            return Err(SparseArrayError::SlotOutOfRange { slot });
        }
        Ok(self.get(slot))
    }

    /// Like [`get_mut`](Self::get_mut), but reports an out-of-range slot as an error.
    pub fn try_get_mut(&mut self, slot: u32) -> Result<Option<&mut T>> {
        if slot >= MAX_SLOTS {
            return Err(SparseArrayError::SlotOutOfRange { slot });
        }
        Ok(self.get_mut(slot))
    }

    /// Occupied slot indices, ascending.
    #[inline]
    pub fn slots(&self) -> Slots {
        Slots::new(self.bitmap())
    }

    /// `(slot, &value)` pairs in ascending slot order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.slots(), self.values().iter())
    }

    /// `(slot, &mut value)` pairs in ascending slot order.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        let slots = self.slots();
        IterMut::new(slots, self.values_mut().iter_mut())
    }

    /// Consume the array, returning its bitmap and values.
    ///
    /// Inverse of [`from_bitmap_and_values`](Self::from_bitmap_and_values); a
    /// higher layer changes occupancy by editing the parts and rebuilding.
    pub fn into_parts(self) -> (u64, Vec<T>) {
        let this = ManuallyDrop::new(self);
        let bitmap = this.bitmap();
        let len = this.len();
        let block = this.raw_block();
        let mut out = Vec::with_capacity(len);
        // SAFETY: the `len` values are moved out bitwise. `this` is never
        // dropped, and `block` frees the memory without dropping them again.
        unsafe {
            ptr::copy_nonoverlapping(this.values_ptr(), out.as_mut_ptr(), len);
            out.set_len(len);
        }
        drop(block);
        (bitmap, out)
    }

    /// Bytes occupied by the backing block.
    #[inline]
    pub fn allocation_size(&self) -> usize {
        self.block_layout().size()
    }

    /// Bytes a block holding `len` values occupies.
    pub fn allocation_size_for(len: usize) -> Result<usize> {
        Ok(layout::array_layout::<T>(len)?.size())
    }

    fn block_layout(&self) -> Layout {
        match layout::array_layout::<T>(self.len()) {
            Ok(layout) => layout,
            // The same length was accepted when the block was allocated.
            Err(e) => unreachable!("layout of a live block: {e}"),
        }
    }

    fn raw_block(&self) -> RawBlock {
        RawBlock {
            ptr: self.header.cast(),
            layout: self.block_layout(),
        }
    }
}

impl<T> Drop for SparseArray<T> {
    fn drop(&mut self) {
        // Freed last, even if a value's destructor unwinds.
        let block = self.raw_block();
        if mem::needs_drop::<T>() {
            // SAFETY: every value is live and is dropped exactly once here.
            unsafe { ptr::drop_in_place(self.values_mut() as *mut [T]) };
        }
        drop(block);
    }
}

impl<T: Clone> Clone for SparseArray<T> {
    /// Deep copy into a fresh block, value by value through `T::clone`.
    fn clone(&self) -> Self {
        match Self::from_bitmap_and_values(self.bitmap(), self.values().iter().cloned()) {
            Ok(copy) => copy,
            Err(e) => unreachable!("clone of a live sparse array rejected: {e}"),
        }
    }
}

impl<T> Default for SparseArray<T> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for SparseArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for SparseArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bitmap() == other.bitmap() && self.values() == other.values()
    }
}

impl<T: Eq> Eq for SparseArray<T> {}

impl<T: Hash> Hash for SparseArray<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bitmap().hash(state);
        self.values().hash(state);
    }
}

impl<'a, T> IntoIterator for &'a SparseArray<T> {
    type Item = (u32, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut SparseArray<T> {
    type Item = (u32, &'a mut T);
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T> IntoIterator for SparseArray<T> {
    type Item = (u32, T);
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        let (bitmap, values) = self.into_parts();
        IntoIter::new(Slots::new(bitmap), values.into_iter())
    }
}
