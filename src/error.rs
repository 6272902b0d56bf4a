//! Error type for sparse array construction and checked lookups.

use crate::bits::MAX_SLOTS;

/// Errors reported at the fallible boundary of [`SparseArray`](crate::SparseArray).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SparseArrayError {
    /// The number of supplied values differs from the bitmap's population count.
    LengthMismatch {
        /// `popcount(bitmap)`.
        expected: usize,
        /// Values supplied, or observed when an iterator misreports its length.
        actual: usize,
    },
    /// A slot index outside `0..64`.
    SlotOutOfRange {
        /// The rejected slot.
        slot: u32,
    },
    /// Header plus values does not fit in a valid allocation layout.
    LayoutOverflow {
        /// Number of values the layout was requested for.
        len: usize,
    },
}

impl std::fmt::Display for SparseArrayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SparseArrayError::LengthMismatch { expected, actual } => write!(
                f,
                "value count mismatch: bitmap has {expected} occupied slots, got {actual} values"
            ),
            SparseArrayError::SlotOutOfRange { slot } => {
                write!(f, "slot {slot} out of range (max {})", MAX_SLOTS - 1)
            }
            SparseArrayError::LayoutOverflow { len } => {
                write!(f, "allocation layout overflow for {len} values")
            }
        }
    }
}

impl std::error::Error for SparseArrayError {}

/// Result type for sparse array operations.
pub type Result<T> = std::result::Result<T, SparseArrayError>;
