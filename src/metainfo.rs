//! Torrent metainfo loading
//!
//! Decodes a bencoded `.torrent` file into [`MetaInfo`] and reduces it to the
//! [`Manifest`] the verifier works from: piece length, the concatenated
//! reference hashes, the declared file list and the total content length.
//!
//! The info hash is the SHA-1 of the bencoded `info` dictionary. It is
//! computed from the generic decoded value so that keys this crate does not
//! model still contribute to it.
//!
//! File and directory names are kept as raw byte strings on decode. A torrent
//! with a name that is not UTF-8 still loads and displays; only turning it
//! into a [`Manifest`] fails, naming the offending entry.

use crate::domain::{LayoutError, PieceLayout, Sha1Hash};
use serde::{Deserialize, Serialize};
use serde_bencode::value::Value;
use serde_bytes::ByteBuf;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading metainfo
#[derive(Debug, Error)]
pub enum MetaInfoError {
    /// Failed to read the torrent file
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Bencode decoding failed
    #[error("Couldn't parse torrent file: {0}")]
    Decode(#[from] serde_bencode::Error),

    /// Top level is not a dictionary or has no `info` dictionary
    #[error("Couldn't parse torrent file: no info dictionary")]
    MissingInfo,

    /// File or directory name is not valid UTF-8
    #[error("Name is not valid UTF-8: {name}")]
    InvalidName { name: String },

    /// Declared file lengths sum past `u64::MAX`
    #[error("Declared file lengths overflow the content length at {path}")]
    LengthOverflow { path: String },
}

/// One entry of a multi-file `files` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDict {
    pub length: u64,
    pub path: Vec<ByteBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5sum: Option<String>,
}

/// The `info` dictionary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoDict {
    #[serde(rename = "piece length")]
    pub piece_length: u64,
    #[serde(with = "serde_bytes")]
    pub pieces: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<i64>,
    pub name: ByteBuf,
    /// Single-file mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5sum: Option<String>,
    /// Multi-file mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileDict>>,
}

/// A decoded `.torrent` file
#[derive(Debug, Clone, Deserialize)]
pub struct MetaInfo {
    pub info: InfoDict,
    #[serde(default)]
    pub announce: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, rename = "created by")]
    pub created_by: Option<String>,
    #[serde(default, rename = "creation date")]
    pub creation_date: Option<i64>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(skip)]
    info_hash: Sha1Hash,
}

impl MetaInfo {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MetaInfoError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| MetaInfoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetaInfoError> {
        let raw: Value = serde_bencode::from_bytes(bytes)?;
        let info = match &raw {
            Value::Dict(top) => top.get(b"info".as_slice()).ok_or(MetaInfoError::MissingInfo)?,
            _ => return Err(MetaInfoError::MissingInfo),
        };
        if !matches!(info, Value::Dict(_)) {
            return Err(MetaInfoError::MissingInfo);
        }
        let info_hash = Sha1Hash::digest(&serde_bencode::to_bytes(info)?);

        let mut meta: MetaInfo = serde_bencode::from_bytes(bytes)?;
        meta.info_hash = info_hash;
        Ok(meta)
    }

    /// SHA-1 fingerprint of the `info` dictionary
    pub fn info_hash(&self) -> Sha1Hash {
        self.info_hash
    }

    pub fn is_single_file(&self) -> bool {
        self.info.files.as_ref().map_or(true, |files| files.is_empty())
    }

    /// Reduce to the fields the verifier needs
    pub fn manifest(&self) -> Result<Manifest, MetaInfoError> {
        let name = utf8_name(&self.info.name)?;
        match &self.info.files {
            Some(files) if !files.is_empty() => {
                let files = files
                    .iter()
                    .map(|f| {
                        let path = f.path.iter().map(utf8_name).collect::<Result<_, _>>()?;
                        Ok(ManifestFile::new(f.length, path))
                    })
                    .collect::<Result<Vec<_>, MetaInfoError>>()?;
                Manifest::multi_file(
                    name,
                    self.info.piece_length,
                    self.info.pieces.clone(),
                    files,
                )
            }
            _ => Ok(Manifest::single_file(
                name,
                self.info.length.unwrap_or(0),
                self.info.piece_length,
                self.info.pieces.clone(),
            )),
        }
    }
}

fn utf8_name(raw: &ByteBuf) -> Result<String, MetaInfoError> {
    String::from_utf8(raw.to_vec()).map_err(|_| MetaInfoError::InvalidName {
        name: lossy(raw).into_owned(),
    })
}

fn lossy(raw: &ByteBuf) -> Cow<'_, str> {
    String::from_utf8_lossy(raw)
}

impl fmt::Display for MetaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}\tPieceLength: {}",
            lossy(&self.info.name),
            self.info.piece_length
        )?;
        match &self.info.files {
            Some(files) if !files.is_empty() => {
                write!(f, "\nSize\t\tFilename")?;
                for file in files {
                    let path: Vec<_> = file.path.iter().map(lossy).collect();
                    write!(f, "\n{}\t\t{}", file.length, path.join("/"))?;
                }
            }
            _ => write!(f, "\nSize: {}", self.info.length.unwrap_or(0))?,
        }
        write!(f, "\n{}", hex::encode_upper(self.info_hash.as_bytes()))?;
        if let Some(encoding) = &self.encoding {
            write!(f, "\t{}", encoding)?;
        }
        Ok(())
    }
}

/// Declared file of a multi-file manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    pub length: u64,
    /// Path components relative to the content root
    pub path: Vec<String>,
}

impl ManifestFile {
    pub fn new(length: u64, path: Vec<String>) -> Self {
        Self { length, path }
    }
}

/// Everything the verifier needs from a torrent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// File name of a single-file manifest (directory name otherwise)
    pub name: String,
    pub piece_length: u64,
    /// Concatenated 20-byte reference hashes in piece order
    pub pieces: Vec<u8>,
    pub total_length: u64,
    /// Empty for single-file manifests
    pub files: Vec<ManifestFile>,
}

impl Manifest {
    pub fn single_file(name: impl Into<String>, length: u64, piece_length: u64, pieces: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            piece_length,
            pieces,
            total_length: length,
            files: Vec::new(),
        }
    }

    /// Fails when the declared lengths do not fit in a `u64` total
    pub fn multi_file(
        name: impl Into<String>,
        piece_length: u64,
        pieces: Vec<u8>,
        files: Vec<ManifestFile>,
    ) -> Result<Self, MetaInfoError> {
        let total_length = files.iter().try_fold(0u64, |total, f| {
            total
                .checked_add(f.length)
                .ok_or_else(|| MetaInfoError::LengthOverflow {
                    path: f.path.join("/"),
                })
        })?;
        Ok(Self {
            name: name.into(),
            piece_length,
            pieces,
            total_length,
            files,
        })
    }

    pub fn is_single_file(&self) -> bool {
        self.files.is_empty()
    }

    pub fn layout(&self) -> Result<PieceLayout, LayoutError> {
        PieceLayout::new(self.total_length, self.piece_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_file_torrent() -> Vec<u8> {
        let mut bytes = b"d8:announce14:http://tracker4:infod6:lengthi5e4:name5:a.txt12:piece lengthi16e6:pieces20:".to_vec();
        bytes.extend_from_slice(Sha1Hash::digest(b"hello").as_bytes());
        bytes.extend_from_slice(b"ee");
        bytes
    }

    #[test]
    fn test_decode_single_file() {
        let meta = MetaInfo::from_bytes(&single_file_torrent()).unwrap();
        assert!(meta.is_single_file());
        assert_eq!(meta.announce.as_deref(), Some("http://tracker"));
        assert_eq!(meta.info.name.as_slice(), b"a.txt");

        let manifest = meta.manifest().unwrap();
        assert_eq!(manifest.name, "a.txt");
        assert_eq!(manifest.total_length, 5);
        assert_eq!(manifest.piece_length, 16);
        assert_eq!(manifest.pieces.len(), 20);
        assert!(manifest.files.is_empty());
    }

    #[test]
    fn test_info_hash_covers_raw_info_dict() {
        let bytes = single_file_torrent();
        let start = bytes.windows(5).position(|w| w == b"infod").unwrap() + 4;
        let info_bytes = &bytes[start..bytes.len() - 1];

        let meta = MetaInfo::from_bytes(&bytes).unwrap();
        assert_eq!(meta.info_hash(), Sha1Hash::digest(info_bytes));
    }

    #[test]
    fn test_missing_info_is_rejected() {
        let err = MetaInfo::from_bytes(b"d8:announce3:urle").unwrap_err();
        assert!(matches!(err, MetaInfoError::MissingInfo));
        assert!(matches!(
            MetaInfo::from_bytes(b"li1ee").unwrap_err(),
            MetaInfoError::MissingInfo
        ));
        assert!(matches!(
            MetaInfo::from_bytes(b"not bencode").unwrap_err(),
            MetaInfoError::Decode(_)
        ));
    }

    #[test]
    fn test_multi_file_manifest_sums_lengths() {
        let manifest = Manifest::multi_file(
            "dir",
            512,
            vec![0; 60],
            vec![
                ManifestFile::new(1024, vec!["a".into()]),
                ManifestFile::new(350, vec!["sub".into(), "b".into()]),
            ],
        )
        .unwrap();
        assert_eq!(manifest.total_length, 1374);
        assert!(!manifest.is_single_file());
        assert_eq!(manifest.layout().unwrap().num_pieces(), 3);
    }

    #[test]
    fn test_overflowing_file_lengths_are_rejected() {
        let err = Manifest::multi_file(
            "dir",
            1,
            Vec::new(),
            vec![
                ManifestFile::new(u64::MAX, vec!["big".into()]),
                ManifestFile::new(2, vec!["sub".into(), "small".into()]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, MetaInfoError::LengthOverflow { ref path } if path == "sub/small"));
    }

    #[test]
    fn test_non_utf8_name_loads_but_has_no_manifest() {
        let mut bytes = b"d4:infod5:filesld6:lengthi3e4:pathl3:ok_4:\xffbadeee4:name3:dir12:piece lengthi16e6:pieces20:".to_vec();
        bytes.extend_from_slice(Sha1Hash::digest(b"abc").as_bytes());
        bytes.extend_from_slice(b"ee");

        let meta = MetaInfo::from_bytes(&bytes).unwrap();
        assert!(meta.to_string().contains("ok_/\u{fffd}bad"));
        let err = meta.manifest().unwrap_err();
        assert!(matches!(err, MetaInfoError::InvalidName { ref name } if name == "\u{fffd}bad"));
    }
}
