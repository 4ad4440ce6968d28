use std::sync::atomic::{AtomicU64, Ordering};

const WORD_BITS: usize = 64;

#[inline]
fn words_for(len: usize) -> usize {
    len.div_ceil(WORD_BITS)
}

/// Fixed length bitset with one bit per leaf
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeafBits {
    words: Vec<u64>,
    len: usize,
}

impl LeafBits {
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; words_for(len)],
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, bit: usize) -> bool {
        self.words[bit / WORD_BITS] & (1 << (bit % WORD_BITS)) != 0
    }

    #[inline]
    pub fn set(&mut self, bit: usize) {
        self.words[bit / WORD_BITS] |= 1 << (bit % WORD_BITS);
    }

    #[inline]
    pub fn clear(&mut self, bit: usize) {
        self.words[bit / WORD_BITS] &= !(1 << (bit % WORD_BITS));
    }

    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn or_assign(&mut self, other: &LeafBits) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= *b;
        }
    }

    pub fn and_assign(&mut self, other: &LeafBits) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= *b;
        }
    }

    /// Write `a & b` into self, returning true if any bit is set that is not
    /// in `exclude`
    pub fn and_into(&mut self, a: &LeafBits, b: &SharedLeafBits, exclude: &LeafBits) -> bool {
        let mut more = 0;
        for (i, out) in self.words.iter_mut().enumerate() {
            *out = a.words[i] & b.word(i);
            more |= *out & !exclude.words[i];
        }
        more != 0
    }

    /// Clear every bit set in `other`
    pub fn and_not(&mut self, other: &LeafBits) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= !*b;
        }
    }

    pub fn is_subset_of(&self, other: &LeafBits) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .all(|(a, b)| a & !b == 0)
    }

    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &w)| {
            let mut w = w;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some(i * WORD_BITS + bit)
            })
        })
    }

    /// Byte row with bit `i` in byte `i >> 3` under mask `1 << (i & 7)`
    pub fn to_row_bytes(&self) -> Vec<u8> {
        let mut row = vec![0u8; self.len.div_ceil(8)];
        for (i, byte) in row.iter_mut().enumerate() {
            *byte = (self.words[i / 8] >> ((i % 8) * 8)) as u8;
        }
        row
    }

    /// Inverse of [`LeafBits::to_row_bytes`]. Bits past `len` are dropped.
    pub fn from_row_bytes(row: &[u8], len: usize) -> Self {
        let mut bits = Self::new(len);
        for (i, &byte) in row.iter().enumerate().take(len.div_ceil(8)) {
            bits.words[i / 8] |= (byte as u64) << ((i % 8) * 8);
        }
        bits.mask_tail();
        bits
    }

    fn mask_tail(&mut self) {
        let rem = self.len % WORD_BITS;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }
}

/// Leaf bitset shared between workers.
///
/// Loads are relaxed and may run at any time. Stores must only happen while
/// the scheduler lock is held, and only ever clear bits of `mightsee` or
/// publish a finished `visbits`, so a stale load can only see more bits than
/// are finally set.
#[derive(Debug, Default)]
pub struct SharedLeafBits {
    words: Vec<AtomicU64>,
    len: usize,
}

impl SharedLeafBits {
    pub fn new(len: usize) -> Self {
        Self {
            words: (0..words_for(len)).map(|_| AtomicU64::new(0)).collect(),
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn word(&self, i: usize) -> u64 {
        self.words[i].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn get(&self, bit: usize) -> bool {
        self.word(bit / WORD_BITS) & (1 << (bit % WORD_BITS)) != 0
    }

    /// Clear one bit, returning whether it was set
    pub fn clear(&self, bit: usize) -> bool {
        let mask = 1u64 << (bit % WORD_BITS);
        self.words[bit / WORD_BITS].fetch_and(!mask, Ordering::Relaxed) & mask != 0
    }

    pub fn snapshot(&self) -> LeafBits {
        LeafBits {
            words: self.words.iter().map(|w| w.load(Ordering::Relaxed)).collect(),
            len: self.len,
        }
    }

    /// Copy into an existing bitset of the same length
    pub fn load_into(&self, out: &mut LeafBits) {
        for (o, w) in out.words.iter_mut().zip(&self.words) {
            *o = w.load(Ordering::Relaxed);
        }
    }

    pub fn store(&self, bits: &LeafBits) {
        for (w, b) in self.words.iter().zip(&bits.words) {
            w.store(*b, Ordering::Relaxed);
        }
    }

    pub fn clear_all(&self) {
        for w in &self.words {
            w.store(0, Ordering::Relaxed);
        }
    }

    pub fn count_ones(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }
}
