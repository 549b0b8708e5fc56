//! Torrent content verification
//!
//! Verifies a directory tree against the SHA-1 piece hashes of a `.torrent`
//! file. Declared files are stitched into one virtual byte stream
//! ([`file_store`]), cut into fixed-size pieces ([`domain::PieceLayout`]) and
//! hashed on a bounded worker pool ([`hasher_pool`]).

pub mod args;
pub mod bitfield;
pub mod domain;
pub mod file_store;
pub mod hasher_pool;
pub mod metainfo;
pub mod path_safety;
pub mod reporters;
pub mod verify;

pub use args::parse_args;
pub use metainfo::{Manifest, ManifestFile, MetaInfo, MetaInfoError};
pub use verify::{verify, VerificationConfig, VerificationReport, VerifyError, VerifyMode};
