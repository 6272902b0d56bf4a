//! Bitmap helpers: slot masks, rank and set-bit iteration.

/// Number of logical slots addressable by one occupancy bitmap.
pub const MAX_SLOTS: u32 = u64::BITS;

#[inline]
pub(crate) fn slot_bit(slot: u32) -> u64 {
    debug_assert!(slot < MAX_SLOTS);
    1u64 << slot
}

/// Mask of every slot strictly below `slot`.
#[inline]
pub(crate) fn mask_below(slot: u32) -> u64 {
    debug_assert!(slot < MAX_SLOTS);
    slot_bit(slot) - 1
}

/// Number of occupied slots strictly below `slot`, i.e. the physical index
/// `slot` maps to when it is occupied.
#[inline]
pub(crate) fn rank(bitmap: u64, slot: u32) -> usize {
    (bitmap & mask_below(slot)).count_ones() as usize
}

#[inline]
pub(crate) fn popcount(bitmap: u64) -> usize {
    bitmap.count_ones() as usize
}

/// Iterator over the set bits of a bitmap, lowest first.
#[derive(Clone, Debug)]
pub struct Slots {
    remaining: u64,
}

impl Slots {
    #[inline]
    pub(crate) fn new(bitmap: u64) -> Self {
        Self { remaining: bitmap }
    }
}

impl Iterator for Slots {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.remaining.trailing_zeros();
        // Clear the lowest set bit.
        self.remaining &= self.remaining - 1;
        Some(slot)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = popcount(self.remaining);
        (n, Some(n))
    }
}

impl DoubleEndedIterator for Slots {
    #[inline]
    fn next_back(&mut self) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        let slot = MAX_SLOTS - 1 - self.remaining.leading_zeros();
        self.remaining &= !slot_bit(slot);
        Some(slot)
    }
}

impl ExactSizeIterator for Slots {}

impl std::iter::FusedIterator for Slots {}
