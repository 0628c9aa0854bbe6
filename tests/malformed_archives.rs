//! Malformed archive handling.
//!
//! Every case must fail with a corruption or policy error, never panic, and
//! never touch the file.

mod common;

use std::io::Cursor;

use common::{create_archive, read_all, stored};
use tempfile::TempDir;
use zipsplice::format::{
    CentralDirectoryRecord, EndOfCentralDirectory, LocalFileHeader, Zip64Eocd, Zip64Locator,
};
use zipsplice::{CompressionMethod, Error, Location, Zip64Policy, ZipArchive, ZipMap};

const DD_FLAG: u8 = 0x08;

/// Builds a stored archive by hand.
///
/// Entries flagged `descriptor` carry a signed data descriptor after the
/// payload. With `zip64` a Zip64 EOCD and locator precede the EOCD.
struct RawArchive {
    entries: Vec<(&'static str, &'static [u8], bool)>,
    zip64: bool,
}

impl RawArchive {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            zip64: false,
        }
    }

    fn entry(mut self, name: &'static str, data: &'static [u8]) -> Self {
        self.entries.push((name, data, false));
        self
    }

    fn with_descriptor(mut self, name: &'static str, data: &'static [u8]) -> Self {
        self.entries.push((name, data, true));
        self
    }

    fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    fn build(&self) -> Vec<u8> {
        let mut file = Vec::new();
        let mut cd = Vec::new();
        for (name, data, descriptor) in &self.entries {
            let offset = file.len() as u64;
            let crc = crc32fast::hash(data);
            let size = data.len() as u64;
            let mut local =
                LocalFileHeader::new(name.as_bytes(), CompressionMethod::Stored, crc, size, size)
                    .encode();
            let mut central = CentralDirectoryRecord::new(
                name.as_bytes(),
                CompressionMethod::Stored,
                crc,
                size,
                size,
                offset,
            )
            .encode();
            file.append(&mut local);
            file.extend_from_slice(data);
            if *descriptor {
                file[offset as usize + 6] |= DD_FLAG;
                central[8] |= DD_FLAG;
                file.extend_from_slice(&0x0807_4b50u32.to_le_bytes());
                file.extend_from_slice(&crc.to_le_bytes());
                file.extend_from_slice(&(size as u32).to_le_bytes());
                file.extend_from_slice(&(size as u32).to_le_bytes());
            }
            cd.append(&mut central);
        }
        let cd_location = Location::new(file.len() as u64, cd.len() as u64);
        file.extend_from_slice(&cd);
        let count = self.entries.len() as u64;
        if self.zip64 {
            let zip64_offset = file.len() as u64;
            file.extend_from_slice(&Zip64Eocd::new(count, cd_location).encode());
            file.extend_from_slice(&Zip64Locator::encode(zip64_offset));
        }
        file.extend_from_slice(&EndOfCentralDirectory::encode(cd_location, count));
        file
    }
}

fn parse(bytes: Vec<u8>) -> zipsplice::Result<ZipMap> {
    ZipMap::from_reader(&mut Cursor::new(bytes), true, Zip64Policy::Allow)
}

fn eocd_offset(bytes: &[u8]) -> usize {
    bytes.len() - EndOfCentralDirectory::SIZE as usize
}

#[test]
fn test_hand_built_archive_parses() {
    let bytes = RawArchive::new().entry("a", b"aa").entry("b", b"bbb").build();
    let map = parse(bytes).unwrap();
    assert_eq!(map.entries().len(), 2);
    assert_eq!(map.entries()["b"].location(), Location::new(33, 34));
    assert!(!map.is_zip64());
}

#[test]
fn test_not_a_zip_file() {
    let err = parse(b"definitely not an archive, just some text".to_vec()).unwrap_err();
    assert!(err.is_corruption());
    assert!(parse(Vec::new()).unwrap_err().is_corruption());
    assert!(parse(vec![0; 21]).unwrap_err().is_corruption());
}

#[test]
fn test_truncated_archive() {
    let bytes = RawArchive::new().entry("a", b"aa").build();
    let truncated = bytes[..bytes.len() - 5].to_vec();
    assert!(parse(truncated).unwrap_err().is_corruption());
}

#[test]
fn test_central_directory_out_of_bounds() {
    let mut bytes = RawArchive::new().entry("a", b"aa").build();
    let at = eocd_offset(&bytes) + 16;
    bytes[at..at + 4].copy_from_slice(&0x00ff_0000u32.to_le_bytes());
    let err = parse(bytes).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)), "{err}");
}

#[test]
fn test_local_header_offset_past_end() {
    let mut bytes = RawArchive::new().entry("a", b"aa").build();
    let cd = 33;
    // Local header offset field of the first record.
    bytes[cd + 42..cd + 46].copy_from_slice(&0x7fff_ffffu32.to_le_bytes());
    assert!(matches!(
        parse(bytes).unwrap_err(),
        Error::CorruptHeader { offset: 0x7fff_ffff, .. }
    ));
}

#[test]
fn test_bad_local_header_signature() {
    let mut bytes = RawArchive::new().entry("a", b"aa").build();
    bytes[0] = b'X';
    let err = parse(bytes).unwrap_err();
    assert!(matches!(err, Error::CorruptHeader { offset: 0, .. }), "{err}");
}

#[test]
fn test_local_name_length_mismatch() {
    let mut bytes = RawArchive::new().entry("a", b"aa").entry("bb", b"b").build();
    // Second local header starts after 30 + 1 + 2 bytes.
    bytes[33 + 26] = 5;
    let err = parse(bytes).unwrap_err();
    assert!(matches!(err, Error::CorruptHeader { offset: 33, .. }), "{err}");
}

#[test]
fn test_payload_overlapping_central_directory() {
    let mut bytes = RawArchive::new().entry("a", b"aa").build();
    let cd = 33;
    // Compressed and uncompressed size of the record.
    bytes[cd + 20..cd + 24].copy_from_slice(&100u32.to_le_bytes());
    bytes[cd + 24..cd + 28].copy_from_slice(&100u32.to_le_bytes());
    assert!(parse(bytes).unwrap_err().is_corruption());
}

#[test]
fn test_duplicate_names_rejected() {
    let bytes = RawArchive::new().entry("a", b"1").entry("a", b"2").build();
    assert!(parse(bytes).unwrap_err().is_corruption());
}

#[test]
fn test_zip64_footer_and_policy() {
    let bytes = RawArchive::new().entry("a", b"aa").zip64().build();
    let map = parse(bytes.clone()).unwrap();
    assert!(map.is_zip64());
    assert_eq!(map.entries()["a"].size, 2);

    let err = ZipMap::from_reader(&mut Cursor::new(bytes), true, Zip64Policy::Forbid)
        .unwrap_err();
    assert!(err.is_policy_violation());
}

#[test]
fn test_zip64_locator_pointing_at_garbage() {
    let mut bytes = RawArchive::new().entry("a", b"aa").zip64().build();
    let locator = eocd_offset(&bytes) - Zip64Locator::SIZE as usize;
    bytes[locator + 8..locator + 16].copy_from_slice(&3u64.to_le_bytes());
    assert!(parse(bytes).unwrap_err().is_corruption());
}

#[test]
fn test_data_descriptor_accounting() {
    let build = || {
        RawArchive::new()
            .with_descriptor("dd", b"hello")
            .entry("plain", b"x")
            .build()
    };

    let map = parse(build()).unwrap();
    let entry = &map.entries()["dd"];
    // Header, name, payload, then a signed 16-byte descriptor.
    assert_eq!(entry.location(), Location::new(0, 30 + 2 + 5 + 16));
    assert_eq!(entry.payload_location(), Location::new(32, 5));
    assert_eq!(map.entries()["plain"].location().first(), 53);

    let map = ZipMap::from_reader(&mut Cursor::new(build()), false, Zip64Policy::Allow).unwrap();
    assert_eq!(map.entries()["dd"].location(), Location::INVALID);
    assert_eq!(map.entries()["dd"].payload_location(), Location::new(32, 5));
    assert!(map.entries()["plain"].location().is_valid());
}

#[test]
fn test_archive_with_data_descriptor_is_editable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dd.zip");
    let bytes = RawArchive::new()
        .with_descriptor("dd", b"hello")
        .entry("plain", b"x")
        .build();
    std::fs::write(&path, &bytes).unwrap();

    let mut archive = ZipArchive::open(&path).unwrap();
    assert_eq!(archive.get_content("dd").unwrap().unwrap(), b"hello");
    archive.delete("dd").unwrap();
    archive.close().unwrap();

    let entries = ZipArchive::list_entries_in(&path).unwrap();
    assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["plain"]);
    assert_eq!(entries["plain"].location().first(), 53);
}

/// Entry "d" has a signed 32-bit data descriptor but its record stores the
/// local header offset through a Zip64 extra field; "e" follows it directly.
fn descriptor_with_zip64_offset() -> Vec<u8> {
    let payload = b"abc";
    let crc = crc32fast::hash(payload);
    let mut file =
        LocalFileHeader::new(b"d", CompressionMethod::Stored, crc, 3, 3).encode();
    file[6] |= DD_FLAG;
    file.extend_from_slice(payload);
    file.extend_from_slice(&0x0807_4b50u32.to_le_bytes());
    file.extend_from_slice(&crc.to_le_bytes());
    file.extend_from_slice(&3u32.to_le_bytes());
    file.extend_from_slice(&3u32.to_le_bytes());

    let mut cd =
        CentralDirectoryRecord::new(b"d", CompressionMethod::Stored, crc, 3, 3, 0).encode();
    cd[8] |= DD_FLAG;
    cd[30..32].copy_from_slice(&12u16.to_le_bytes());
    cd[42..46].copy_from_slice(&[0xFF; 4]);
    cd.extend_from_slice(&[0x01, 0x00, 8, 0]);
    cd.extend_from_slice(&0u64.to_le_bytes());

    let e_offset = file.len() as u64;
    let e_crc = crc32fast::hash(b"eee");
    file.extend_from_slice(
        &LocalFileHeader::new(b"e", CompressionMethod::Stored, e_crc, 3, 3).encode(),
    );
    file.extend_from_slice(b"eee");
    cd.extend_from_slice(
        &CentralDirectoryRecord::new(b"e", CompressionMethod::Stored, e_crc, 3, 3, e_offset)
            .encode(),
    );

    let cd_location = Location::new(file.len() as u64, cd.len() as u64);
    file.extend_from_slice(&cd);
    file.extend_from_slice(&EndOfCentralDirectory::encode(cd_location, 2));
    file
}

#[test]
fn test_zip64_offset_keeps_32_bit_descriptor() {
    let map = parse(descriptor_with_zip64_offset()).unwrap();
    // Header, name, payload, then a signed 16-byte descriptor.
    assert_eq!(map.entries()["d"].location(), Location::new(0, 50));
    assert!(map.entries()["d"].is_zip64);
    assert_eq!(map.entries()["e"].location().first(), 50);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("z64dd.zip");
    std::fs::write(&path, descriptor_with_zip64_offset()).unwrap();
    let mut archive = ZipArchive::open(&path).unwrap();
    archive.delete("d").unwrap();
    // Header, one-byte name and 19 bytes fill the freed 50 bytes exactly.
    archive.add(stored("x", &[7u8; 19])).unwrap();
    archive.close().unwrap();

    let entries = ZipArchive::list_entries_in(&path).unwrap();
    assert_eq!(entries["x"].location(), Location::new(0, 50));
    assert_eq!(entries["e"].location().first(), 50);
    let contents = read_all(&path);
    assert_eq!(contents["e"], b"eee");
    assert_eq!(contents["x"], vec![7u8; 19]);
}

#[test]
fn test_open_rejects_garbage_without_modifying_it() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.zip");
    std::fs::write(&path, b"PK\x03\x04 but nothing else").unwrap();

    let err = ZipArchive::open(&path).unwrap_err();
    assert!(err.is_corruption());
    assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04 but nothing else");
}

#[test]
fn test_zip64_archive_rejected_by_forbid_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("z64.zip");
    std::fs::write(&path, RawArchive::new().entry("a", b"a").zip64().build()).unwrap();
    let options = zipsplice::ArchiveOptions::new().zip64_policy(Zip64Policy::Forbid);
    let err = ZipArchive::open_with_options(&path, options).unwrap_err();
    assert!(err.is_policy_violation());

    let path = create_archive(&dir, "plain.zip", &[("a", b"a")]);
    let options = zipsplice::ArchiveOptions::new().zip64_policy(Zip64Policy::Forbid);
    assert!(ZipArchive::open_with_options(&path, options).is_ok());
}
