//! Occupancy bitmap for slot allocation.
//!
//! One bit per slot, packed into `u64` words. A set bit marks an occupied
//! slot. The bitmap length doubles as the number of allocated slots.

const WORD_BITS: usize = u64::BITS as usize;

#[derive(Debug, Clone, Default)]
pub struct OccupancyBitmap {
    words: Vec<u64>,
    len: usize,
}

impl OccupancyBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.words[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
    }

    /// Sets or clears the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.len, "bit {index} out of range {}", self.len);
        let mask = 1u64 << (index % WORD_BITS);
        let word = &mut self.words[index / WORD_BITS];
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Index of the lowest clear bit, if any.
    pub fn first_clear(&self) -> Option<usize> {
        self.words.iter().enumerate().find_map(|(w, &word)| {
            if word == u64::MAX {
                return None;
            }
            let index = w * WORD_BITS + (!word).trailing_zeros() as usize;
            (index < self.len).then_some(index)
        })
    }

    /// Grows (or shrinks) to `len` bits; new bits are clear.
    pub fn resize(&mut self, len: usize) {
        self.words.resize(len.div_ceil(WORD_BITS), 0);
        if len < self.len {
            let tail = len % WORD_BITS;
            if tail != 0 {
                if let Some(last) = self.words.last_mut() {
                    *last &= (1u64 << tail) - 1;
                }
            }
        }
        self.len = len;
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates the indices of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let offset = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(w * WORD_BITS + offset)
            })
        })
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bitmap_has_no_free_bit() {
        let bits = OccupancyBitmap::new();
        assert_eq!(bits.first_clear(), None);
        assert!(bits.is_empty());
    }

    #[test]
    fn first_clear_skips_full_words() {
        let mut bits = OccupancyBitmap::new();
        bits.resize(130);
        for i in 0..70 {
            bits.set(i, true);
        }
        assert_eq!(bits.first_clear(), Some(70));
        bits.set(3, false);
        assert_eq!(bits.first_clear(), Some(3));
    }

    #[test]
    fn first_clear_respects_len_in_partial_word() {
        let mut bits = OccupancyBitmap::new();
        bits.resize(3);
        for i in 0..3 {
            bits.set(i, true);
        }
        assert_eq!(bits.first_clear(), None);
    }

    #[test]
    fn resize_preserves_existing_bits() {
        let mut bits = OccupancyBitmap::new();
        bits.resize(16);
        bits.set(5, true);
        bits.set(15, true);
        bits.resize(32);
        assert!(bits.get(5));
        assert!(bits.get(15));
        assert!(!bits.get(16));
        assert_eq!(bits.count_ones(), 2);
    }

    #[test]
    fn shrinking_drops_tail_bits() {
        let mut bits = OccupancyBitmap::new();
        bits.resize(10);
        bits.set(9, true);
        bits.set(1, true);
        bits.resize(5);
        assert_eq!(bits.count_ones(), 1);
        assert!(!bits.get(9));
    }

    #[test]
    fn iter_ones_yields_ascending_indices() {
        let mut bits = OccupancyBitmap::new();
        bits.resize(200);
        for i in [0, 63, 64, 127, 199] {
            bits.set(i, true);
        }
        let ones: Vec<usize> = bits.iter_ones().collect();
        assert_eq!(ones, vec![0, 63, 64, 127, 199]);
    }

    #[test]
    #[should_panic]
    fn set_out_of_range_panics() {
        let mut bits = OccupancyBitmap::new();
        bits.resize(4);
        bits.set(4, true);
    }
}
