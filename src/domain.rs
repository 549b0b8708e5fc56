//! Core domain types for piece verification
//!
//! This module contains type-safe wrappers for piece indices and digests, plus
//! the piece sizing rule shared by every scan path.
//!
//! ## Type Safety Benefits
//!
//! - **PieceIndex**: Prevents mixing piece numbers with byte offsets and counts
//! - **Sha1Hash**: Prevents comparing a digest against an arbitrary 20-byte slice
//!   without going through the reference table layout
//! - **PieceLayout**: Keeps the "last piece may be short" rule in one place

use thiserror::Error;

/// Width in bytes of one reference hash record.
pub const HASH_SIZE: usize = 20;

/// Largest piece length accepted; one piece is held in memory per in-flight job.
pub const MAX_PIECE_LENGTH: u64 = 1 << 28;

/// Type-safe wrapper for piece indices (position in the logical content stream)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PieceIndex(usize);

impl PieceIndex {
    pub fn new(index: usize) -> Self {
        PieceIndex(index)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl From<usize> for PieceIndex {
    fn from(index: usize) -> Self {
        PieceIndex::new(index)
    }
}

impl std::fmt::Display for PieceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe wrapper for SHA-1 piece digests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Sha1Hash([u8; HASH_SIZE]);

impl Sha1Hash {
    pub fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Sha1Hash(bytes)
    }

    /// Hash a complete piece buffer
    pub fn digest(data: &[u8]) -> Self {
        use sha1::{Digest, Sha1};
        Sha1Hash(Sha1::digest(data).into())
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Lower-case hex rendering, used in log lines and mismatch reports
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; HASH_SIZE]> for Sha1Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Sha1Hash::new(bytes)
    }
}

impl AsRef<[u8]> for Sha1Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq<[u8]> for Sha1Hash {
    fn eq(&self, other: &[u8]) -> bool {
        self.0[..] == *other
    }
}

impl std::fmt::Display for Sha1Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Piece geometry of a content stream
///
/// `num_pieces = ceil(total_length / piece_length)`; every piece is
/// `piece_length` bytes except the last, which holds the remainder.
/// Piece geometry that cannot be represented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("Invalid piece length: 0")]
    ZeroPieceLength,

    #[error("Piece length {piece_length} exceeds the supported maximum of {max}")]
    PieceTooLarge { piece_length: u64, max: u64 },

    #[error("Content length {total_length} with piece length {piece_length} has too many pieces")]
    TooManyPieces { total_length: u64, piece_length: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceLayout {
    total_length: u64,
    piece_length: u64,
    num_pieces: usize,
    hash_table_len: usize,
}

impl PieceLayout {
    /// Validate the geometry up front so every later size and offset
    /// computation stays in range.
    pub fn new(total_length: u64, piece_length: u64) -> Result<Self, LayoutError> {
        if piece_length == 0 {
            return Err(LayoutError::ZeroPieceLength);
        }
        if piece_length > MAX_PIECE_LENGTH {
            return Err(LayoutError::PieceTooLarge {
                piece_length,
                max: MAX_PIECE_LENGTH,
            });
        }
        let too_many = LayoutError::TooManyPieces {
            total_length,
            piece_length,
        };
        let num_pieces =
            usize::try_from(total_length.div_ceil(piece_length)).map_err(|_| too_many)?;
        let hash_table_len = num_pieces.checked_mul(HASH_SIZE).ok_or(too_many)?;
        Ok(Self {
            total_length,
            piece_length,
            num_pieces,
            hash_table_len,
        })
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn piece_length(&self) -> u64 {
        self.piece_length
    }

    pub fn num_pieces(&self) -> usize {
        self.num_pieces
    }

    /// Expected size of the reference hash table in bytes
    pub fn hash_table_len(&self) -> usize {
        self.hash_table_len
    }

    /// Global byte offset of the first byte of `index`
    pub fn piece_offset(&self, index: PieceIndex) -> u64 {
        index.as_usize() as u64 * self.piece_length
    }

    /// Length of `index`, or `None` past the last piece
    pub fn piece_size(&self, index: PieceIndex) -> Option<usize> {
        let i = index.as_usize();
        if i >= self.num_pieces {
            return None;
        }
        let start = self.piece_offset(index);
        Some((self.total_length - start).min(self.piece_length) as usize)
    }

    pub fn indices(&self) -> impl Iterator<Item = PieceIndex> {
        (0..self.num_pieces).map(PieceIndex::new)
    }
}
