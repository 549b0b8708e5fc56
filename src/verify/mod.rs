//! Piece verification
//!
//! Checks on-disk content against a torrent's piece hash table. The
//! orchestrator picks a policy per run (single-file, full multi-file or
//! partial multi-file), builds the file store for it and drives the
//! [`PieceVerifier`].

mod config;
mod error;
mod orchestrator;
mod types;
mod verifier;

// Re-export public types
pub use config::{VerificationConfig, DEFAULT_QUEUE_DEPTH};
pub use error::{VerifyError, VerifyResult};
pub use orchestrator::{
    reporter_for, select_mode, verify, verify_full, verify_mode_with_reporter, verify_partial,
    verify_single, verify_with_reporter,
};
pub use types::{PieceOutcome, PieceTally, VerificationReport, VerifyMode};
pub use verifier::PieceVerifier;
