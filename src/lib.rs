//! # thin-sparse
//!
//! A bitmap-indexed sparse array behind a one-word handle.
//!
//! [`SparseArray<T>`] stores the occupied slots of a conceptual 64-slot array.
//! A `u64` bitmap records which slots are occupied; the values of those slots
//! are packed densely, in slot order, right after the bitmap in a single heap
//! block sized to exactly `bitmap.count_ones()` values. The handle itself is a
//! thin pointer to that block, so `size_of::<SparseArray<T>>()` is one word.
//!
//! This is the node primitive of hash-array-mapped tries: slot `i` lives at
//! physical index `popcount(bitmap & ((1 << i) - 1))`.
//!
//! ## Example
//!
//! ```rust
//! use thin_sparse::SparseArray;
//!
//! let node = SparseArray::from_bitmap_and_values(0b1001, [10, 20]).unwrap();
//! assert_eq!(node.len(), 2);
//! assert_eq!(node.get(0), Some(&10));
//! assert_eq!(node.get(1), None);
//! assert_eq!(node.get(3), Some(&20));
//! assert_eq!(std::mem::size_of_val(&node), std::mem::size_of::<usize>());
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

mod array;
mod bits;
mod error;
mod iter;
mod layout;

pub use array::SparseArray;
pub use bits::{Slots, MAX_SLOTS};
pub use error::{Result, SparseArrayError};
pub use iter::{IntoIter, Iter, IterMut};


#[cfg(test)]
mod proptests;
