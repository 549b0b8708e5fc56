//! Verification orchestrator
//!
//! Picks the verification policy from on-disk file presence, builds the
//! [`FileStore`] for it and drives the [`PieceVerifier`]. Every file handle
//! opened here is owned by the store and closed when the run returns, on
//! success and on every early error.

use super::config::VerificationConfig;
use super::error::*;
use super::types::*;
use super::verifier::PieceVerifier;
use crate::file_store::{FileSegment, FileStore, StoreError};
use crate::hasher_pool::HasherPool;
use crate::metainfo::Manifest;
use crate::path_safety::resolve_declared_path;
use crate::reporters::{
    ConsoleVerificationReporter, SilentVerificationReporter, VerificationReporter,
};
use log::{debug, info, warn};
use std::fs::{self, File};
use std::path::Path;

/// Reporter selected by `config.echo`
pub fn reporter_for(config: &VerificationConfig) -> Box<dyn VerificationReporter> {
    if config.echo {
        Box::new(ConsoleVerificationReporter::new())
    } else {
        Box::new(SilentVerificationReporter::new())
    }
}

/// Choose the verification policy for `manifest` under `root`
///
/// Single-file manifests verify in `Single` mode. Multi-file manifests verify
/// in `Full` mode when every declared file exists, otherwise in `Partial`
/// mode. Sizes are not checked here; both multi-file modes reject a present
/// file of the wrong size.
pub fn select_mode(manifest: &Manifest, root: &Path) -> VerifyResult<VerifyMode> {
    if manifest.is_single_file() {
        return Ok(VerifyMode::Single);
    }
    for entry in &manifest.files {
        let path = resolve_declared_path(root, &entry.path)?;
        if !path.exists() {
            debug!("{} not found, using partial verification", path.display());
            return Ok(VerifyMode::Partial);
        }
    }
    Ok(VerifyMode::Full)
}

/// Verify the content under `root` against `manifest`
///
/// Reports through the console when `config.echo` is set.
pub fn verify(
    manifest: &Manifest,
    root: &Path,
    config: &VerificationConfig,
) -> VerifyResult<VerificationReport> {
    verify_with_reporter(manifest, root, config, reporter_for(config).as_ref())
}

/// Verify with an explicit reporter
pub fn verify_with_reporter<R>(
    manifest: &Manifest,
    root: &Path,
    config: &VerificationConfig,
    reporter: &R,
) -> VerifyResult<VerificationReport>
where
    R: VerificationReporter + ?Sized,
{
    let mode = select_mode(manifest, root)?;
    verify_mode_with_reporter(mode, manifest, root, config, reporter)
}

/// Verify a single-file manifest
pub fn verify_single(
    manifest: &Manifest,
    root: &Path,
    config: &VerificationConfig,
) -> VerifyResult<VerificationReport> {
    verify_mode_with_reporter(VerifyMode::Single, manifest, root, config, reporter_for(config).as_ref())
}

/// Verify a multi-file manifest whose files must all be present
pub fn verify_full(
    manifest: &Manifest,
    root: &Path,
    config: &VerificationConfig,
) -> VerifyResult<VerificationReport> {
    verify_mode_with_reporter(VerifyMode::Full, manifest, root, config, reporter_for(config).as_ref())
}

/// Verify a multi-file manifest, tolerating absent files
pub fn verify_partial(
    manifest: &Manifest,
    root: &Path,
    config: &VerificationConfig,
) -> VerifyResult<VerificationReport> {
    verify_mode_with_reporter(VerifyMode::Partial, manifest, root, config, reporter_for(config).as_ref())
}

/// Run one specific policy, skipping presence probing
pub fn verify_mode_with_reporter<R>(
    mode: VerifyMode,
    manifest: &Manifest,
    root: &Path,
    config: &VerificationConfig,
    reporter: &R,
) -> VerifyResult<VerificationReport>
where
    R: VerificationReporter + ?Sized,
{
    reporter.report_mode(mode);

    let tally = match mode {
        VerifyMode::Single => {
            let store = open_single(manifest, root)?;
            full_scan(&store, manifest, config, reporter)?
        }
        VerifyMode::Full => {
            let store = open_full(manifest, root)?;
            full_scan(&store, manifest, config, reporter)?
        }
        VerifyMode::Partial => {
            let store = open_partial(manifest, root, reporter)?;
            partial_scan(&store, manifest, reporter)?
        }
    };

    info!("Good pieces: {} Bad pieces: {}", tally.good, tally.bad);
    if tally.missing > 0 {
        info!("Missing file for critical piece: {}", tally.missing);
    }

    let report = tally.into_report(mode);
    reporter.report_results(&report);
    Ok(report)
}

fn open_single(manifest: &Manifest, root: &Path) -> VerifyResult<FileStore> {
    if !manifest.is_single_file() {
        return Err(VerifyError::MultiFileManifest);
    }
    let path = resolve_declared_path(root, &[manifest.name.as_str()])?;
    let file = File::open(&path).map_err(|e| VerifyError::from_access(path.clone(), e))?;
    let actual = file
        .metadata()
        .map_err(|e| VerifyError::from_access(path.clone(), e))?
        .len();
    if actual != manifest.total_length {
        return Err(VerifyError::SizeMismatch {
            path,
            expected: manifest.total_length,
            actual,
        });
    }
    Ok(FileStore::new(vec![FileSegment::present(path, actual, file)])?)
}

fn open_full(manifest: &Manifest, root: &Path) -> VerifyResult<FileStore> {
    if manifest.is_single_file() {
        return Err(VerifyError::SingleFileManifest);
    }
    let mut segments = Vec::with_capacity(manifest.files.len());
    for entry in &manifest.files {
        let path = resolve_declared_path(root, &entry.path)?;
        let actual = fs::metadata(&path)
            .map_err(|e| VerifyError::from_access(path.clone(), e))?
            .len();
        if actual != entry.length {
            return Err(VerifyError::SizeMismatch {
                path,
                expected: entry.length,
                actual,
            });
        }
        let segment = FileSegment::open(&path, entry.length)
            .map_err(|e| VerifyError::from_access(path.clone(), e))?;
        segments.push(segment);
    }
    Ok(FileStore::new(segments)?)
}

fn open_partial<R>(manifest: &Manifest, root: &Path, reporter: &R) -> VerifyResult<FileStore>
where
    R: VerificationReporter + ?Sized,
{
    if manifest.is_single_file() {
        return Err(VerifyError::SingleFileManifest);
    }
    let mut segments = Vec::with_capacity(manifest.files.len());
    for entry in &manifest.files {
        let path = resolve_declared_path(root, &entry.path)?;
        match fs::metadata(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Skip file: {}", path.display());
                reporter.report_file_skipped(&path);
                segments.push(FileSegment::absent(path, entry.length));
            }
            Err(e) => return Err(VerifyError::from_access(path, e)),
            Ok(meta) if meta.len() != entry.length => {
                return Err(VerifyError::SizeMismatch {
                    path,
                    expected: entry.length,
                    actual: meta.len(),
                });
            }
            Ok(_) => {
                let segment = FileSegment::open(&path, entry.length)
                    .map_err(|e| VerifyError::from_access(path.clone(), e))?;
                segments.push(segment);
            }
        }
    }
    Ok(FileStore::new(segments)?)
}

fn full_scan<R>(
    store: &FileStore,
    manifest: &Manifest,
    config: &VerificationConfig,
    reporter: &R,
) -> VerifyResult<PieceTally>
where
    R: VerificationReporter + ?Sized,
{
    let verifier = PieceVerifier::new(
        store,
        manifest.total_length,
        manifest.piece_length,
        &manifest.pieces,
    )?;
    verifier.verify_all(&HasherPool::from_config(config), reporter)
}

/// Check each piece in order with a direct read, accepting pieces that lie
/// in absent files as missing
fn partial_scan<R>(store: &FileStore, manifest: &Manifest, reporter: &R) -> VerifyResult<PieceTally>
where
    R: VerificationReporter + ?Sized,
{
    let verifier = PieceVerifier::new(
        store,
        manifest.total_length,
        manifest.piece_length,
        &manifest.pieces,
    )?;
    let num_pieces = verifier.layout().num_pieces();
    let mut tally = PieceTally::new(num_pieces);

    for index in verifier.layout().indices() {
        match verifier.verify_one(index) {
            Ok(outcome) => tally.record(index, outcome),
            Err(err @ VerifyError::Store(StoreError::OutOfRange { .. })) => return Err(err),
            Err(err) => {
                warn!("Piece {}: {}", index, err);
                reporter.report_piece_error(index, &err.to_string());
                tally.record_failure();
            }
        }
        reporter.report_piece_progress(index.as_usize() + 1, num_pieces);
    }

    Ok(tally)
}
