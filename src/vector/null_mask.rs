//! Bit-packed null mask (1 bit per logical position).
//!
//! A set bit marks a null slot. Freshly allocated and newly grown positions
//! start out null, so a slot reads as a value only after something writes it.

/// Packed null mask parallel to a column vector's value buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NullMask {
    /// Each u64 holds 64 null bits (LSB = position 0)
    words: Vec<u64>,
    /// Number of positions covered (not bits allocated)
    len: usize,
}

impl NullMask {
    /// Creates a mask with every position null.
    #[must_use]
    pub fn new_all_null(len: usize) -> Self {
        let mut mask = Self {
            words: vec![!0u64; len.div_ceil(64)],
            len,
        };
        mask.clear_tail();
        mask
    }

    /// Zeroes the unused bits of the last word.
    fn clear_tail(&mut self) {
        let rem = self.len % 64;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if position `i` is null. Positions past the end are null.
    #[inline]
    #[must_use]
    pub fn is_null(&self, i: usize) -> bool {
        if i >= self.len {
            return true;
        }
        (self.words[i >> 6] >> (i & 63)) & 1 == 1
    }

    /// Marks position `i` null or not-null.
    ///
    /// # Panics
    ///
    /// Panics if `i` is past the end of the mask.
    #[inline]
    pub fn set(&mut self, i: usize, null: bool) {
        assert!(i < self.len, "null mask index out of bounds");
        let mask = 1u64 << (i & 63);
        if null {
            self.words[i >> 6] |= mask;
        } else {
            self.words[i >> 6] &= !mask;
        }
    }

    /// Resizes to `new_len` positions.
    ///
    /// With `preserve_data`, the first `min(len, new_len)` bits are kept and
    /// new positions are null; otherwise every position becomes null.
    pub fn resize(&mut self, new_len: usize, preserve_data: bool) {
        if !preserve_data {
            *self = Self::new_all_null(new_len);
            return;
        }
        let old_len = self.len;
        self.words.resize(new_len.div_ceil(64), !0u64);
        // Bits between the old length and the end of its last word were
        // cleared, so re-mark them null.
        if new_len > old_len && old_len % 64 != 0 {
            let w = old_len >> 6;
            self.words[w] |= !0u64 << (old_len & 63);
        }
        self.len = new_len;
        self.clear_tail();
    }

    /// Marks every position null.
    pub fn fill_null(&mut self) {
        self.words.fill(!0u64);
        self.clear_tail();
    }

    /// Number of null positions.
    #[must_use]
    pub fn null_count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Bytes held by the packed words.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.words.len() * std::mem::size_of::<u64>()
    }

    /// Iterates null flags for positions `0..len`.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.is_null(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_null() {
        let mask = NullMask::new_all_null(100);
        assert_eq!(mask.len(), 100);
        assert_eq!(mask.null_count(), 100);
        for i in 0..100 {
            assert!(mask.is_null(i), "bit {i} should be null");
        }
    }

    #[test]
    fn test_set_get() {
        let mut mask = NullMask::new_all_null(100);
        mask.set(50, false);
        assert!(!mask.is_null(50));
        assert!(mask.is_null(49));
        assert!(mask.is_null(51));
        assert_eq!(mask.null_count(), 99);
        mask.set(50, true);
        assert!(mask.is_null(50));
    }

    #[test]
    fn test_past_end_is_null() {
        let mask = NullMask::new_all_null(3);
        assert!(mask.is_null(3));
        assert!(mask.is_null(1000));
    }

    #[test]
    fn test_resize_preserves_and_nulls_new_positions() {
        let mut mask = NullMask::new_all_null(70);
        for i in 0..70 {
            mask.set(i, false);
        }
        mask.resize(140, true);
        assert_eq!(mask.len(), 140);
        for i in 0..70 {
            assert!(!mask.is_null(i), "bit {i} should survive growth");
        }
        for i in 70..140 {
            assert!(mask.is_null(i), "bit {i} should start null");
        }
        assert_eq!(mask.null_count(), 70);
    }

    #[test]
    fn test_resize_without_preserve() {
        let mut mask = NullMask::new_all_null(8);
        mask.set(0, false);
        mask.resize(16, false);
        assert_eq!(mask.null_count(), 16);
    }

    #[test]
    fn test_shrink_keeps_count_consistent() {
        let mut mask = NullMask::new_all_null(128);
        mask.set(100, false);
        mask.resize(10, true);
        assert_eq!(mask.len(), 10);
        assert_eq!(mask.null_count(), 10);
    }

    #[test]
    fn test_fill_null_and_byte_size() {
        let mut mask = NullMask::new_all_null(65);
        mask.set(0, false);
        mask.fill_null();
        assert_eq!(mask.null_count(), 65);
        assert_eq!(mask.byte_size(), 16);
        assert_eq!(mask.iter().filter(|&n| n).count(), 65);
    }
}
