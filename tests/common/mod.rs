//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use torrentcheck::domain::Sha1Hash;
use torrentcheck::{Manifest, ManifestFile};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic non-repeating content
pub fn patterned(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u32).wrapping_mul(31).wrapping_add(seed as u32 * 7) as u8 ^ (i >> 8) as u8)
        .collect()
}

/// Concatenated SHA-1 of each `piece_length` chunk of `content`
pub fn reference_table(content: &[u8], piece_length: usize) -> Vec<u8> {
    content
        .chunks(piece_length)
        .flat_map(|piece| *Sha1Hash::digest(piece).as_bytes())
        .collect()
}

pub fn write_file(root: &Path, components: &[&str], data: &[u8]) -> PathBuf {
    let path = components.iter().fold(root.to_path_buf(), |p, c| p.join(c));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, data).unwrap();
    path
}

/// Multi-file content on disk plus the manifest describing it
pub struct MultiFileFixture {
    pub dir: TempDir,
    pub manifest: Manifest,
    pub paths: Vec<PathBuf>,
    pub content: Vec<u8>,
}

impl MultiFileFixture {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// `files` pairs a `/`-separated declared path with the file's content
pub fn multi_file_fixture(piece_length: usize, files: &[(&str, Vec<u8>)]) -> MultiFileFixture {
    let dir = TempDir::new().unwrap();
    let mut content = Vec::new();
    let mut entries = Vec::new();
    let mut paths = Vec::new();

    for (declared, data) in files {
        let components: Vec<&str> = declared.split('/').collect();
        paths.push(write_file(dir.path(), &components, data));
        content.extend_from_slice(data);
        entries.push(ManifestFile::new(
            data.len() as u64,
            components.iter().map(|c| c.to_string()).collect(),
        ));
    }

    let manifest = Manifest::multi_file(
        "content",
        piece_length as u64,
        reference_table(&content, piece_length),
        entries,
    )
    .unwrap();
    MultiFileFixture {
        dir,
        manifest,
        paths,
        content,
    }
}

/// The two-file layout: 1024 + 350 bytes, 512-byte pieces
pub fn two_file_fixture() -> MultiFileFixture {
    multi_file_fixture(
        512,
        &[
            ("a.bin", patterned(1024, 1)),
            ("sub/b.bin", patterned(350, 2)),
        ],
    )
}

pub fn single_file_fixture(name: &str, data: &[u8], piece_length: usize) -> (TempDir, Manifest) {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), &[name], data);
    let manifest = Manifest::single_file(
        name,
        data.len() as u64,
        piece_length as u64,
        reference_table(data, piece_length),
    );
    (dir, manifest)
}

/// Flip every bit of the byte at `offset` in `path`
pub fn corrupt_byte(path: &Path, offset: usize) {
    let mut data = fs::read(path).unwrap();
    data[offset] ^= 0xff;
    fs::write(path, data).unwrap();
}
