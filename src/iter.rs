//! Iterators pairing occupied slots with their values.

use std::iter::{FusedIterator, Zip};
use std::{slice, vec};

use crate::bits::Slots;

macro_rules! slot_iter {
    ($(#[$doc:meta])* $name:ident [$($gen:tt)*], $inner:ty, $item:ty) => {
        $(#[$doc])*
        pub struct $name<$($gen)*> {
            inner: Zip<Slots, $inner>,
        }

        impl<$($gen)*> $name<$($gen)*> {
            pub(crate) fn new(slots: Slots, values: $inner) -> Self {
                debug_assert_eq!(slots.len(), values.len());
                Self {
                    inner: slots.zip(values),
                }
            }
        }

        impl<$($gen)*> Iterator for $name<$($gen)*> {
            type Item = $item;

            #[inline]
            fn next(&mut self) -> Option<Self::Item> {
                self.inner.next()
            }

            #[inline]
            fn size_hint(&self) -> (usize, Option<usize>) {
                self.inner.size_hint()
            }
        }

        impl<$($gen)*> DoubleEndedIterator for $name<$($gen)*> {
            #[inline]
            fn next_back(&mut self) -> Option<Self::Item> {
                self.inner.next_back()
            }
        }

        impl<$($gen)*> ExactSizeIterator for $name<$($gen)*> {}

        impl<$($gen)*> FusedIterator for $name<$($gen)*> {}
    };
}

slot_iter!(
    /// Borrowing iterator over `(slot, &value)`, see [`SparseArray::iter`](crate::SparseArray::iter).
    Iter ['a, T],
    slice::Iter<'a, T>,
    (u32, &'a T)
);

slot_iter!(
    /// Mutable iterator over `(slot, &mut value)`.
    IterMut ['a, T],
    slice::IterMut<'a, T>,
    (u32, &'a mut T)
);

slot_iter!(
    /// Owning iterator over `(slot, value)`.
    IntoIter [T],
    vec::IntoIter<T>,
    (u32, T)
);
