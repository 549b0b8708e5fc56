//! Fixed-size piece bit vector
//!
//! One flag per piece, packed most-significant-bit first the way BitTorrent
//! bitfields are laid out on the wire. The size is fixed at construction.

use crate::domain::PieceIndex;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BitField {
    bytes: Vec<u8>,
    bits: usize,
}

impl BitField {
    /// Create a bit vector of `bits` flags, all cleared
    pub fn new(bits: usize) -> Self {
        Self {
            bytes: vec![0; bits.div_ceil(8)],
            bits,
        }
    }

    /// Set the flag for `index`. Out-of-range indices are ignored.
    pub fn set(&mut self, index: PieceIndex) {
        let idx = index.as_usize();
        if idx >= self.bits {
            return;
        }
        self.bytes[idx / 8] |= 1u8 << (7 - (idx % 8));
    }

    pub fn get(&self, index: PieceIndex) -> bool {
        let idx = index.as_usize();
        if idx >= self.bits {
            return false;
        }
        self.bytes[idx / 8] & (1u8 << (7 - (idx % 8))) != 0
    }

    /// Number of flags that are set
    pub fn count_ones(&self) -> usize {
        // Padding bits past `bits` are never set, so a plain popcount is exact
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn len(&self) -> usize {
        self.bits
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn is_all_set(&self) -> bool {
        self.count_ones() == self.bits
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Indices whose flag is clear, in increasing order
    pub fn unset_indices(&self) -> impl Iterator<Item = PieceIndex> + '_ {
        (0..self.bits)
            .map(PieceIndex::new)
            .filter(move |&i| !self.get(i))
    }
}
