//! Error types for verification runs

use crate::domain::{LayoutError, PieceIndex};
use crate::file_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a verification run
///
/// Per-piece outcomes (good, bad, missing) are never reported through this
/// type; they are tallied in [`super::PieceTally`].
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Manifest declares a zero piece length
    #[error("Invalid piece length: 0")]
    InvalidPieceLength,

    /// Manifest declares a piece length too large to buffer
    #[error("Piece length {piece_length} exceeds the supported maximum of {max}")]
    PieceLengthTooLarge { piece_length: u64, max: u64 },

    /// Declared lengths are too large to lay out as pieces
    #[error("Declared content is too large: {reason}")]
    ContentTooLarge { reason: String },

    /// Reference hash table does not hold exactly one record per piece
    #[error("Malformed manifest: piece hash table is {actual} bytes, expected {expected}")]
    MalformedManifest { expected: usize, actual: usize },

    /// Declared total length disagrees with the files backing the store
    #[error("Declared content length {declared} does not match file layout length {actual}")]
    TotalLengthMismatch { declared: u64, actual: u64 },

    /// File on disk has a different size than declared
    #[error("{}: size not match (expected {expected} bytes, found {actual})", path.display())]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Declared file does not exist where the mode requires it
    #[error("Missing file: {}", path.display())]
    MissingFile { path: PathBuf },

    /// Multi-file entry point called with a single-file manifest
    #[error("Torrent has single file structure")]
    SingleFileManifest,

    /// Single-file entry point called with a multi-file manifest
    #[error("Torrent has multiple file structure")]
    MultiFileManifest,

    /// Declared path would escape the content root
    #[error("Unsafe path {path:?}: {reason}")]
    UnsafePath { path: String, reason: &'static str },

    /// Piece index past the end of the content
    #[error("Piece {index} out of range ({num_pieces} pieces)")]
    PieceOutOfRange { index: PieceIndex, num_pieces: usize },

    /// Hasher pool finished without producing every piece exactly once
    #[error("Incomplete scan: {received} of {expected} piece digests collected")]
    IncompleteScan { expected: usize, received: usize },

    /// Failed to start the hashing thread pool
    #[error("Failed to build hashing thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Read failure from the virtual file store
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failed to open or stat a declared file
    #[error("Failed to access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl VerifyError {
    /// Map an I/O failure on a declared file to `MissingFile` or `FileAccess`
    pub(crate) fn from_access(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            VerifyError::MissingFile { path }
        } else {
            VerifyError::FileAccess { path, source }
        }
    }
}

impl From<LayoutError> for VerifyError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::ZeroPieceLength => VerifyError::InvalidPieceLength,
            LayoutError::PieceTooLarge { piece_length, max } => {
                VerifyError::PieceLengthTooLarge { piece_length, max }
            }
            LayoutError::TooManyPieces { .. } => VerifyError::ContentTooLarge {
                reason: err.to_string(),
            },
        }
    }
}

/// Type alias for verification results
pub type VerifyResult<T> = std::result::Result<T, VerifyError>;
