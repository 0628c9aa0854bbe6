//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zipsplice::format::LocalFileHeader;
use zipsplice::{ByteSource, Location, ZipArchive, ZipInfo};

/// Creates an archive at `dir/name` holding `entries`, stored.
pub fn create_archive(dir: &TempDir, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    create_archive_with_level(dir, name, entries, 0)
}

/// Creates an archive at `dir/name` holding `entries`, compressed at `level`.
pub fn create_archive_with_level(
    dir: &TempDir,
    name: &str,
    entries: &[(&str, &[u8])],
    level: u32,
) -> PathBuf {
    let path = dir.path().join(name);
    let mut archive = ZipArchive::open(&path).unwrap();
    for (entry_name, data) in entries {
        archive
            .add(ByteSource::new(data.to_vec(), *entry_name, level).unwrap())
            .unwrap();
    }
    archive.close().unwrap();
    path
}

/// Stored byte source.
pub fn stored(name: &str, data: &[u8]) -> ByteSource {
    ByteSource::new(data.to_vec(), name, 0).unwrap()
}

/// Reads every entry of the archive at `path` into memory.
pub fn read_all(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut archive = ZipArchive::open(path).unwrap();
    let mut contents = BTreeMap::new();
    for name in archive.list_entries() {
        let data = archive.get_content(&name).unwrap().unwrap();
        contents.insert(name, data);
    }
    archive.close().unwrap();
    contents
}

/// A record found by walking local headers from offset 0.
#[derive(Debug, Clone)]
pub struct ScannedRecord {
    pub name: Vec<u8>,
    pub location: Location,
    pub payload: Location,
}

/// Walks the payload region header to header, the way a streaming reader
/// would, and returns every record including nameless fillers.
///
/// Panics if a header is missing or a record crosses the region end.
pub fn scan_local_headers(bytes: &[u8], info: &ZipInfo) -> Vec<ScannedRecord> {
    let end = info.payload.end() as usize;
    let mut records = Vec::new();
    let mut pos = 0usize;
    while pos < end {
        let header = LocalFileHeader::decode(&bytes[pos..end])
            .unwrap_or_else(|e| panic!("no local header at {:#x}: {}", pos, e));
        let header_size = header.encoded_size() as usize;
        let payload_size = header.compressed_size() as usize;
        let record_end = pos + header_size + payload_size;
        assert!(record_end <= end, "record at {:#x} crosses {:#x}", pos, end);
        records.push(ScannedRecord {
            name: header.name().to_vec(),
            location: Location::new(pos as u64, (record_end - pos) as u64),
            payload: Location::new((pos + header_size) as u64, payload_size as u64),
        });
        pos = record_end;
    }
    assert_eq!(pos, end);
    records
}

/// Records of named entries only.
pub fn named_records(bytes: &[u8], info: &ZipInfo) -> BTreeMap<String, ScannedRecord> {
    scan_local_headers(bytes, info)
        .into_iter()
        .filter(|r| !r.name.is_empty())
        .map(|r| (String::from_utf8(r.name.clone()).unwrap(), r))
        .collect()
}

/// Deterministic, poorly compressible bytes.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}
