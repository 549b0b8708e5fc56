//! Piece verifier
//!
//! Compares piece digests against the reference hash table, either for the
//! whole content through the [`HasherPool`] or for one piece at a time with a
//! direct read.

use super::error::*;
use super::types::*;
use crate::domain::{PieceIndex, PieceLayout, Sha1Hash, HASH_SIZE};
use crate::file_store::{FileStore, StoreError};
use crate::hasher_pool::HasherPool;
use crate::reporters::VerificationReporter;
use log::{debug, warn};

/// Verifier over one store and its reference hash table
pub struct PieceVerifier<'a> {
    store: &'a FileStore,
    layout: PieceLayout,
    reference: &'a [u8],
}

impl<'a> PieceVerifier<'a> {
    /// Check the manifest geometry against the store before any hashing
    ///
    /// Fails with `MalformedManifest` unless the reference table holds
    /// exactly `num_pieces * HASH_SIZE` bytes.
    pub fn new(
        store: &'a FileStore,
        total_length: u64,
        piece_length: u64,
        reference: &'a [u8],
    ) -> VerifyResult<Self> {
        let layout = PieceLayout::new(total_length, piece_length)?;

        if reference.len() != layout.hash_table_len() {
            return Err(VerifyError::MalformedManifest {
                expected: layout.hash_table_len(),
                actual: reference.len(),
            });
        }
        if store.total_length() != total_length {
            return Err(VerifyError::TotalLengthMismatch {
                declared: total_length,
                actual: store.total_length(),
            });
        }

        Ok(Self {
            store,
            layout,
            reference,
        })
    }

    pub fn layout(&self) -> &PieceLayout {
        &self.layout
    }

    /// Reference record for `index`
    pub fn reference_hash(&self, index: PieceIndex) -> VerifyResult<&'a [u8]> {
        let start = index.as_usize() * HASH_SIZE;
        self.reference
            .get(start..start + HASH_SIZE)
            .ok_or(VerifyError::PieceOutOfRange {
                index,
                num_pieces: self.layout.num_pieces(),
            })
    }

    /// Read and hash a single piece
    pub fn piece_digest(&self, index: PieceIndex) -> VerifyResult<Result<Sha1Hash, StoreError>> {
        let size = self
            .layout
            .piece_size(index)
            .ok_or(VerifyError::PieceOutOfRange {
                index,
                num_pieces: self.layout.num_pieces(),
            })?;
        let mut piece = vec![0u8; size];
        Ok(self
            .store
            .read_at(&mut piece, self.layout.piece_offset(index))
            .map(|()| Sha1Hash::digest(&piece)))
    }

    /// Hash every piece through `pool` and classify each as good or bad
    ///
    /// A piece that could not be read counts as bad; the scan continues.
    /// An out-of-range read means the piece geometry is wrong and aborts.
    pub fn verify_all<R>(&self, pool: &HasherPool, reporter: &R) -> VerifyResult<PieceTally>
    where
        R: VerificationReporter + ?Sized,
    {
        let digests = pool.compute_digests(self.store, &self.layout, |done, total| {
            reporter.report_piece_progress(done, total)
        })?;
        let (digests, mut failures) = digests.into_parts();

        if let Some(pos) = failures
            .iter()
            .position(|(_, err)| matches!(err, StoreError::OutOfRange { .. }))
        {
            let (_, err) = failures.swap_remove(pos);
            return Err(err.into());
        }

        let mut unreadable = vec![false; self.layout.num_pieces()];
        for (index, err) in &failures {
            warn!("Piece {} unreadable: {}", index, err);
            reporter.report_piece_error(*index, &err.to_string());
            unreadable[index.as_usize()] = true;
        }

        let mut tally = PieceTally::new(self.layout.num_pieces());
        for (index, chunk) in self.layout.indices().zip(digests.chunks_exact(HASH_SIZE)) {
            let expected = self.reference_hash(index)?;
            let outcome = if !unreadable[index.as_usize()] && chunk == expected {
                PieceOutcome::Good
            } else {
                PieceOutcome::Bad
            };
            tally.record(index, outcome);
        }

        debug!("Good pieces: {} Bad pieces: {}", tally.good, tally.bad);
        Ok(tally)
    }

    /// Verify one piece with a direct read
    ///
    /// A piece lying in an absent file yields `Missing`, which callers treat
    /// as acceptable. Any other read failure is returned as an error and is
    /// neither good nor bad.
    pub fn verify_one(&self, index: PieceIndex) -> VerifyResult<PieceOutcome> {
        let expected = self.reference_hash(index)?;
        match self.piece_digest(index)? {
            Ok(digest) if digest == *expected => Ok(PieceOutcome::Good),
            Ok(digest) => {
                debug!(
                    "Piece {}: reference sha1 {} != piece sha1 {}",
                    index,
                    hex::encode(expected),
                    digest
                );
                Ok(PieceOutcome::Bad)
            }
            Err(err) if err.is_missing_data() => {
                debug!("Piece {}: {}", index, err);
                Ok(PieceOutcome::Missing)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_store::FileSegment;
    use crate::reporters::SilentVerificationReporter;
    use std::io::Write;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    /// Records the pieces reported as unreadable
    #[derive(Default)]
    struct ErrorLog(Mutex<Vec<PieceIndex>>);

    impl VerificationReporter for ErrorLog {
        fn report_mode(&self, _mode: VerifyMode) {}
        fn report_file_skipped(&self, _path: &Path) {}
        fn report_piece_progress(&self, _done: usize, _total: usize) {}
        fn report_piece_error(&self, index: PieceIndex, _error: &str) {
            self.0.lock().unwrap().push(index);
        }
        fn report_results(&self, _report: &VerificationReport) {}
    }

    /// 256 readable bytes followed by 256 bytes of an absent file
    fn half_absent_store(data: &[u8]) -> (NamedTempFile, FileStore) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        let store = FileStore::new(vec![
            FileSegment::open(file.path(), 256).unwrap(),
            FileSegment::absent("absent.bin", 256),
        ])
        .unwrap();
        (file, store)
    }

    fn reference_for(data: &[u8], piece_length: usize) -> Vec<u8> {
        data.chunks(piece_length)
            .flat_map(|piece| *Sha1Hash::digest(piece).as_bytes())
            .collect()
    }

    fn store_with(data: &[u8]) -> (NamedTempFile, FileStore) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        let segment = FileSegment::open(file.path(), data.len() as u64).unwrap();
        (file, FileStore::new(vec![segment]).unwrap())
    }

    #[test]
    fn test_rejects_malformed_reference_table() {
        let data = vec![7u8; 100];
        let (_file, store) = store_with(&data);
        let mut reference = reference_for(&data, 32);
        reference.pop();

        let err = PieceVerifier::new(&store, 100, 32, &reference).err().unwrap();
        assert!(matches!(
            err,
            VerifyError::MalformedManifest {
                expected: 80,
                actual: 79
            }
        ));
    }

    #[test]
    fn test_rejects_zero_piece_length() {
        let (_file, store) = store_with(b"abc");
        let err = PieceVerifier::new(&store, 3, 0, &[]).err().unwrap();
        assert!(matches!(err, VerifyError::InvalidPieceLength));
    }

    #[test]
    fn test_verify_one_good_and_bad() {
        let data: Vec<u8> = (0..=255u8).cycle().take(300).collect();
        let (_file, store) = store_with(&data);
        let mut reference = reference_for(&data, 128);
        reference[HASH_SIZE] ^= 0xff;

        let verifier = PieceVerifier::new(&store, 300, 128, &reference).unwrap();
        assert_eq!(verifier.verify_one(PieceIndex::new(0)).unwrap(), PieceOutcome::Good);
        assert_eq!(verifier.verify_one(PieceIndex::new(1)).unwrap(), PieceOutcome::Bad);
        assert_eq!(verifier.verify_one(PieceIndex::new(2)).unwrap(), PieceOutcome::Good);
        assert!(matches!(
            verifier.verify_one(PieceIndex::new(3)),
            Err(VerifyError::PieceOutOfRange { .. })
        ));
    }

    #[test]
    fn test_verify_all_counts_every_piece() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 251) as u8).collect();
        let (_file, store) = store_with(&data);
        let reference = reference_for(&data, 64);

        let verifier = PieceVerifier::new(&store, 1000, 64, &reference).unwrap();
        let tally = verifier
            .verify_all(&HasherPool::new(3, 2), &SilentVerificationReporter)
            .unwrap();
        assert_eq!(tally.good, 16);
        assert_eq!(tally.bad, 0);
        assert!(tally.pieces.is_all_set());
    }

    #[test]
    fn test_verify_all_classifies_unreadable_pieces_as_bad() {
        let data: Vec<u8> = (0..256u32).map(|i| (i * 3) as u8).collect();
        let (_file, store) = half_absent_store(&data);
        let mut reference = reference_for(&data, 128);
        reference.extend(reference_for(&[0xaa; 256], 128));

        let verifier = PieceVerifier::new(&store, 512, 128, &reference).unwrap();
        let errors = ErrorLog::default();
        let tally = verifier.verify_all(&HasherPool::new(2, 1), &errors).unwrap();

        assert_eq!((tally.good, tally.bad, tally.missing), (2, 2, 0));
        assert_eq!(tally.bad_pieces, vec![PieceIndex::new(2), PieceIndex::new(3)]);
        assert!(tally.pieces.get(PieceIndex::new(0)));
        assert!(tally.pieces.get(PieceIndex::new(1)));
        assert!(!tally.pieces.get(PieceIndex::new(2)));
        assert!(!tally.pieces.get(PieceIndex::new(3)));
        assert_eq!(
            errors.0.into_inner().unwrap(),
            vec![PieceIndex::new(2), PieceIndex::new(3)]
        );
    }

    #[test]
    fn test_unreadable_piece_is_bad_even_with_zeroed_reference() {
        let data = vec![1u8; 256];
        let (_file, store) = half_absent_store(&data);
        // Unreadable slots in the digest buffer stay zeroed; a zeroed
        // reference record must not make them look good.
        let mut reference = reference_for(&data, 128);
        reference.extend([0u8; 2 * HASH_SIZE]);

        let verifier = PieceVerifier::new(&store, 512, 128, &reference).unwrap();
        let tally = verifier
            .verify_all(&HasherPool::new(1, 1), &SilentVerificationReporter)
            .unwrap();

        assert_eq!(tally.good, 2);
        assert_eq!(tally.bad, 2);
        assert_eq!(tally.good + tally.bad, verifier.layout().num_pieces());
        assert!(!tally.pieces.get(PieceIndex::new(2)));
    }

    #[test]
    fn test_verify_one_reports_absent_data_as_missing() {
        let data = vec![9u8; 256];
        let (_file, store) = half_absent_store(&data);
        let mut reference = reference_for(&data, 128);
        reference.extend([0u8; 2 * HASH_SIZE]);

        let verifier = PieceVerifier::new(&store, 512, 128, &reference).unwrap();
        assert_eq!(verifier.verify_one(PieceIndex::new(1)).unwrap(), PieceOutcome::Good);
        assert_eq!(verifier.verify_one(PieceIndex::new(2)).unwrap(), PieceOutcome::Missing);
    }
}
