//! Parallel piece hashing pipeline
//!
//! One reader thread produces pieces in index order, a fixed pool of hashing
//! workers turns them into SHA-1 digests, and the calling thread collects the
//! digests into a buffer addressed by piece index:
//!
//! ```text
//! reader --(bounded work queue)--> N hashers --(bounded result queue)--> collector
//! ```
//!
//! Hashers finish out of order; the collector writes each digest at
//! `index * HASH_SIZE`, so the output bytes do not depend on scheduling.
//! A piece whose read failed still travels the whole pipeline and is recorded
//! as a failure, never silently dropped.

use crate::domain::{PieceIndex, PieceLayout, Sha1Hash, HASH_SIZE};
use crate::file_store::{FileStore, StoreError};
use crate::verify::{VerificationConfig, VerifyError, VerifyResult};
use crossbeam_channel::{bounded, Receiver, Sender};
use log::debug;

/// Raw piece bytes, or the read error that prevented producing them
pub struct PieceJob {
    pub index: PieceIndex,
    pub data: Result<Vec<u8>, StoreError>,
}

struct PieceDigest {
    index: PieceIndex,
    digest: Result<Sha1Hash, StoreError>,
}

/// Index-addressed digests for every piece of a scan
#[derive(Debug)]
pub struct PieceDigests {
    digests: Vec<u8>,
    failures: Vec<(PieceIndex, StoreError)>,
}

impl PieceDigests {
    /// Concatenated digests in piece order, laid out like the reference table.
    /// Slots of failed pieces stay zeroed.
    pub fn as_bytes(&self) -> &[u8] {
        &self.digests
    }

    pub fn digest(&self, index: PieceIndex) -> Option<&[u8]> {
        let start = index.as_usize() * HASH_SIZE;
        self.digests.get(start..start + HASH_SIZE)
    }

    pub fn num_pieces(&self) -> usize {
        self.digests.len() / HASH_SIZE
    }

    /// Pieces whose data could not be read, sorted by index
    pub fn failures(&self) -> &[(PieceIndex, StoreError)] {
        &self.failures
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<(PieceIndex, StoreError)>) {
        (self.digests, self.failures)
    }
}

/// Bounded reader/hasher/collector pipeline
#[derive(Debug, Clone)]
pub struct HasherPool {
    workers: usize,
    queue_depth: usize,
}

impl HasherPool {
    pub fn new(workers: usize, queue_depth: usize) -> Self {
        Self {
            workers: workers.max(1),
            queue_depth: queue_depth.max(1),
        }
    }

    pub fn from_config(config: &VerificationConfig) -> Self {
        Self::new(config.effective_threads(), config.effective_queue_depth())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Read every piece of `layout` from `store` in order and hash it
    ///
    /// `on_piece(done, total)` is called from the collecting thread after
    /// each digest is placed.
    pub fn compute_digests<F>(
        &self,
        store: &FileStore,
        layout: &PieceLayout,
        on_piece: F,
    ) -> VerifyResult<PieceDigests>
    where
        F: FnMut(usize, usize),
    {
        let layout = *layout;
        let jobs = layout.indices().map(move |index| {
            let size = layout.piece_size(index).unwrap_or(0);
            let mut data = vec![0u8; size];
            let data = store
                .read_at(&mut data, layout.piece_offset(index))
                .map(|()| data);
            PieceJob { index, data }
        });
        self.hash_pieces(layout.num_pieces(), jobs, on_piece)
    }

    /// Hash `num_pieces` jobs supplied by `jobs`
    ///
    /// `jobs` must yield every index in `0..num_pieces` exactly once. The
    /// iterator is drained on a dedicated reader thread so it may block on I/O.
    pub fn hash_pieces<I, F>(
        &self,
        num_pieces: usize,
        jobs: I,
        mut on_piece: F,
    ) -> VerifyResult<PieceDigests>
    where
        I: IntoIterator<Item = PieceJob>,
        I::IntoIter: Send,
        F: FnMut(usize, usize),
    {
        if num_pieces == 0 {
            return Ok(PieceDigests {
                digests: Vec::new(),
                failures: Vec::new(),
            });
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("piece-hasher-{i}"))
            .build()?;
        let (work_tx, work_rx) = bounded::<PieceJob>(self.queue_depth);
        let (result_tx, result_rx) = bounded::<PieceDigest>(self.queue_depth);
        let workers = self.workers;
        let jobs = jobs.into_iter();

        debug!(
            "Hashing {} pieces with {} workers (queue depth {})",
            num_pieces, workers, self.queue_depth
        );

        std::thread::scope(|scope| {
            scope.spawn(move || {
                for job in jobs {
                    if work_tx.send(job).is_err() {
                        break;
                    }
                }
            });

            scope.spawn(move || {
                pool.scope(|s| {
                    for _ in 0..workers {
                        let rx = work_rx.clone();
                        let tx = result_tx.clone();
                        s.spawn(move |_| hash_worker(rx, tx));
                    }
                });
            });

            collect_digests(num_pieces, result_rx, &mut on_piece)
        })
    }
}

fn hash_worker(jobs: Receiver<PieceJob>, results: Sender<PieceDigest>) {
    for job in jobs.iter() {
        let digest = job.data.map(|data| Sha1Hash::digest(&data));
        if results
            .send(PieceDigest {
                index: job.index,
                digest,
            })
            .is_err()
        {
            break;
        }
    }
}

fn collect_digests<F>(
    num_pieces: usize,
    results: Receiver<PieceDigest>,
    on_piece: &mut F,
) -> VerifyResult<PieceDigests>
where
    F: FnMut(usize, usize),
{
    let mut digests = vec![0u8; num_pieces * HASH_SIZE];
    let mut failures = Vec::new();
    let mut seen = vec![false; num_pieces];
    let mut received = 0usize;

    while received < num_pieces {
        let Ok(result) = results.recv() else {
            break;
        };
        let i = result.index.as_usize();
        if i >= num_pieces || seen[i] {
            return Err(VerifyError::IncompleteScan {
                expected: num_pieces,
                received,
            });
        }
        seen[i] = true;
        received += 1;

        match result.digest {
            Ok(digest) => {
                digests[i * HASH_SIZE..(i + 1) * HASH_SIZE].copy_from_slice(digest.as_bytes())
            }
            Err(err) => failures.push((result.index, err)),
        }
        on_piece(received, num_pieces);
    }

    if received < num_pieces {
        return Err(VerifyError::IncompleteScan {
            expected: num_pieces,
            received,
        });
    }

    failures.sort_by_key(|(index, _)| *index);
    Ok(PieceDigests { digests, failures })
}
