//! Block layout: a [`Header`] followed by a tail of `T` values.
//!
//! Every size, alignment and offset computation for the backing block lives
//! here. Construction, accessors and teardown all go through these functions so
//! the layout used to allocate is always the layout used to deallocate.

use std::alloc::Layout;
use std::mem;
use std::ptr::NonNull;

use crate::error::{Result, SparseArrayError};

/// Start of every block.
#[repr(C)]
pub(crate) struct Header {
    pub(crate) bitmap: u64,
}

/// Byte offset of the first value: the header size rounded up to `T`'s alignment.
#[inline]
pub(crate) const fn values_offset<T>() -> usize {
    let align = mem::align_of::<T>();
    (mem::size_of::<Header>() + align - 1) & !(align - 1)
}

#[inline]
const fn block_align<T>() -> usize {
    let header = mem::align_of::<Header>();
    let value = mem::align_of::<T>();
    if value > header {
        value
    } else {
        header
    }
}

/// Layout of a block holding `len` values.
///
/// The size is never zero: the header is always present, so an empty array
/// still owns a real allocation.
pub(crate) fn array_layout<T>(len: usize) -> Result<Layout> {
    let size = mem::size_of::<T>()
        .checked_mul(len)
        .and_then(|tail| tail.checked_add(values_offset::<T>()))
        .ok_or(SparseArrayError::LayoutOverflow { len })?;
    let layout = Layout::from_size_align(size, block_align::<T>())
        .map_err(|_| SparseArrayError::LayoutOverflow { len })?;
    Ok(layout.pad_to_align())
}

/// Pointer to the first value slot of a block.
///
/// # Safety
///
/// `header` must point at a live block allocated with `array_layout::<T>(_)`.
#[inline]
pub(crate) unsafe fn values_ptr<T>(header: NonNull<Header>) -> *mut T {
    // SAFETY: the value offset is within the block, or one past its end when
    // the tail is empty.
    unsafe {
        header
            .as_ptr()
            .cast::<u8>()
            .add(values_offset::<T>())
            .cast::<T>()
    }
}
