//! Virtual multi-file store
//!
//! Presents an ordered list of declared files as one contiguous byte space.
//! Each declared file becomes a [`FileSegment`] whose global start offset is
//! the sum of the lengths before it. A segment whose backing file is absent is
//! kept in the layout, so offsets stay correct, but any read that reaches it
//! fails with [`StoreError::MissingData`].
//!
//! Reads are positioned (`pread` on unix), so the store holds no cursor and
//! can be shared by reference across the hashing threads.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced by building a [`FileStore`] or reading from it
#[derive(Debug, Error)]
pub enum StoreError {
    /// Segment lengths sum past `u64::MAX`
    #[error("content length overflows at {}", path.display())]
    LengthOverflow { path: PathBuf },

    /// The range touches a segment whose backing file is absent
    #[error("no data for {}: file is absent (segment starts at offset {segment_offset})", path.display())]
    MissingData {
        path: PathBuf,
        segment_offset: u64,
    },

    /// The range extends past the end of the content
    #[error("range {offset}+{len} exceeds content length {total}")]
    OutOfRange { offset: u64, len: usize, total: u64 },

    /// The backing file failed to deliver the bytes
    #[error("failed to read {len} bytes at {offset} from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        offset: u64,
        len: usize,
        source: io::Error,
    },
}

impl StoreError {
    pub fn is_missing_data(&self) -> bool {
        matches!(self, StoreError::MissingData { .. })
    }
}

/// Backing file of a segment
#[derive(Debug)]
pub enum SegmentHandle {
    Present(File),
    Absent,
}

/// One declared file's contribution to the content stream
#[derive(Debug)]
pub struct FileSegment {
    path: PathBuf,
    length: u64,
    handle: SegmentHandle,
}

impl FileSegment {
    pub fn present(path: impl Into<PathBuf>, length: u64, file: File) -> Self {
        Self {
            path: path.into(),
            length,
            handle: SegmentHandle::Present(file),
        }
    }

    pub fn absent(path: impl Into<PathBuf>, length: u64) -> Self {
        Self {
            path: path.into(),
            length,
            handle: SegmentHandle::Absent,
        }
    }

    /// Open `path` read-only as a present segment of declared `length`
    pub fn open(path: impl Into<PathBuf>, length: u64) -> io::Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        Ok(Self::present(path, length, file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn is_present(&self) -> bool {
        matches!(self.handle, SegmentHandle::Present(_))
    }
}

/// Ordered segments plus their derived start offsets. Immutable once built.
#[derive(Debug)]
pub struct FileStore {
    segments: Vec<FileSegment>,
    offsets: Vec<u64>,
    total_length: u64,
}

impl FileStore {
    pub fn new(segments: Vec<FileSegment>) -> Result<Self, StoreError> {
        let mut offsets = Vec::with_capacity(segments.len());
        let mut total_length = 0u64;
        for segment in &segments {
            offsets.push(total_length);
            total_length = total_length.checked_add(segment.length).ok_or_else(|| {
                StoreError::LengthOverflow {
                    path: segment.path.clone(),
                }
            })?;
        }
        Ok(Self {
            segments,
            offsets,
            total_length,
        })
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn segments(&self) -> &[FileSegment] {
        &self.segments
    }

    /// Start offset of every segment, in declaration order
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    pub fn missing_segment_count(&self) -> usize {
        self.segments.iter().filter(|s| !s.is_present()).count()
    }

    /// Fill `buf` with the content bytes starting at global `offset`
    ///
    /// The read walks forward through every segment the range overlaps. It
    /// fails as soon as it reaches an absent segment; whatever was already
    /// copied into `buf` is then meaningless.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), StoreError> {
        let len = buf.len();
        let total = self.total_length;
        let out_of_range = || StoreError::OutOfRange { offset, len, total };
        let end = offset
            .checked_add(len as u64)
            .ok_or_else(out_of_range)?;
        if end > self.total_length {
            return Err(out_of_range());
        }
        if buf.is_empty() {
            return Ok(());
        }

        // Greatest start offset <= `offset`; zero-length segments sharing a
        // start with their successor are skipped by this search.
        let mut index = self.offsets.partition_point(|&start| start <= offset) - 1;
        let mut filled = 0usize;

        while filled < len {
            let (segment, start) = match (self.segments.get(index), self.offsets.get(index)) {
                (Some(segment), Some(&start)) => (segment, start),
                _ => return Err(out_of_range()),
            };
            let position = offset + filled as u64 - start;
            let available = segment.length.saturating_sub(position);
            let count = available.min((len - filled) as u64) as usize;

            if count > 0 {
                match &segment.handle {
                    SegmentHandle::Absent => {
                        return Err(StoreError::MissingData {
                            path: segment.path.clone(),
                            segment_offset: start,
                        });
                    }
                    SegmentHandle::Present(file) => {
                        read_exact_at(file, &mut buf[filled..filled + count], position).map_err(
                            |source| StoreError::Io {
                                path: segment.path.clone(),
                                offset: position,
                                len: count,
                                source,
                            },
                        )?;
                    }
                }
                filled += count;
            }
            index += 1;
        }

        Ok(())
    }
}

// Positioned reads are provided for unix (`pread`) and windows (`seek_read`)
// targets only. The windows arm repeats `read_exact_at`'s short-read loop.
#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut std::mem::take(&mut buf)[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
