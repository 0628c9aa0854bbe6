//! In-memory overlay of the Central Directory.
//!
//! The original Central Directory bytes are kept as read. Deleting a
//! persisted entry only records the byte range of its record; on flush the
//! surviving ranges are copied verbatim and the records of added entries are
//! encoded after them. Unchanged records are never re-encoded.

use std::collections::BTreeMap;
use std::io::Write;

use crate::codec::CompressionMethod;
use crate::format::{CentralDirectoryRecord, Location};
use crate::read::Entry;
use crate::{Error, Result};

/// A record added during this session.
#[derive(Debug, Clone)]
struct AddedRecord {
    record: CentralDirectoryRecord,
    location: Location,
    payload_location: Location,
}

/// Where to find an entry's payload and how to decode it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExtractionInfo {
    pub payload_location: Location,
    pub compression: CompressionMethod,
}

#[derive(Debug)]
pub(crate) struct CentralDirectory {
    buffer: Option<Vec<u8>>,
    entries: BTreeMap<String, Entry>,
    added: BTreeMap<String, AddedRecord>,
    deleted: Vec<Location>,
    nameless: u64,
}

impl Default for CentralDirectory {
    fn default() -> Self {
        Self::new(Vec::new(), BTreeMap::new(), 0)
    }
}

impl CentralDirectory {
    /// Wraps a parsed Central Directory. `nameless` counts records that have
    /// no name and therefore no entry.
    pub fn new(buffer: Vec<u8>, entries: BTreeMap<String, Entry>, nameless: u64) -> Self {
        Self {
            buffer: Some(buffer),
            entries,
            added: BTreeMap::new(),
            deleted: Vec::new(),
            nameless,
        }
    }

    /// Removes `name` and returns the on-disk range it occupied.
    ///
    /// Returns [`Location::INVALID`] if nothing by that name exists.
    pub fn delete(&mut self, name: &str) -> Result<Location> {
        if let Some(entry) = self.entries.get(name) {
            if !entry.location().is_valid() {
                return Err(Error::IllegalState(format!(
                    "cannot reclaim '{}': its on-disk extent is unknown",
                    name
                )));
            }
            let location = entry.location();
            self.deleted.push(entry.cd_location());
            self.entries.remove(name);
            return Ok(location);
        }
        if let Some(added) = self.added.remove(name) {
            return Ok(added.location);
        }
        Ok(Location::INVALID)
    }

    /// Registers the record of an entry just written at `location`.
    pub fn add(
        &mut self,
        name: &str,
        record: CentralDirectoryRecord,
        location: Location,
        payload_location: Location,
    ) -> Result<()> {
        if self.contains(name) {
            return Err(Error::EntryExists { name: name.into() });
        }
        self.added.insert(
            name.to_string(),
            AddedRecord {
                record,
                location,
                payload_location,
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name) || self.added.contains_key(name)
    }

    /// Number of records the flushed directory will hold.
    pub fn num_entries(&self) -> u64 {
        (self.entries.len() + self.added.len()) as u64 + self.nameless
    }

    /// Persisted names, then added names, each in name order.
    pub fn list_entries(&self) -> Vec<String> {
        self.entries
            .keys()
            .chain(self.added.keys())
            .cloned()
            .collect()
    }

    pub fn extraction_info(&self, name: &str) -> Option<ExtractionInfo> {
        if let Some(entry) = self.entries.get(name) {
            return Some(ExtractionInfo {
                payload_location: entry.payload_location(),
                compression: entry.compression,
            });
        }
        self.added.get(name).map(|added| ExtractionInfo {
            payload_location: added.payload_location,
            compression: added.record.method(),
        })
    }

    /// Ranges of the original buffer that survive deletion.
    fn clean_ranges(&mut self, buffer_len: u64) -> Vec<Location> {
        self.deleted.sort();
        let mut clean = Vec::with_capacity(self.deleted.len() + 1);
        let mut cursor = 0u64;
        for deleted in &self.deleted {
            if deleted.first() > cursor {
                clean.push(Location::from_bounds(cursor, deleted.first()));
            }
            cursor = cursor.max(deleted.end());
        }
        if cursor < buffer_len {
            clean.push(Location::from_bounds(cursor, buffer_len));
        }
        clean
    }

    /// Size in bytes of the flushed directory.
    pub fn encoded_size(&mut self) -> u64 {
        let buffer_len = self.buffer.as_ref().map_or(0, |b| b.len() as u64);
        let kept: u64 = self
            .clean_ranges(buffer_len)
            .iter()
            .map(Location::size)
            .sum();
        kept + self.added.values().map(|a| a.record.size()).sum::<u64>()
    }

    /// Writes the compacted directory and returns its size.
    ///
    /// The original buffer is consumed; a second call fails.
    pub fn write_to<W: Write>(&mut self, w: &mut W) -> Result<u64> {
        let buffer = self
            .buffer
            .take()
            .ok_or_else(|| Error::IllegalState("central directory already written".into()))?;

        let mut written = 0u64;
        for range in self.clean_ranges(buffer.len() as u64) {
            w.write_all(&buffer[range.first() as usize..range.end() as usize])?;
            written += range.size();
        }

        let mut fresh = Vec::new();
        for added in self.added.values() {
            fresh.extend_from_slice(&added.record.encode());
        }
        w.write_all(&fresh)?;
        written += fresh.len() as u64;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{EndOfCentralDirectory, LocalFileHeader, Zip64Policy};
    use crate::read::ZipMap;
    use std::io::Cursor;

    fn parsed(names: &[&str]) -> CentralDirectory {
        let mut file = Vec::new();
        let mut cd = Vec::new();
        for name in names {
            let offset = file.len() as u64;
            file.extend_from_slice(
                &LocalFileHeader::new(name.as_bytes(), CompressionMethod::Stored, 0, 1, 1)
                    .encode(),
            );
            file.push(b'x');
            cd.extend_from_slice(
                &CentralDirectoryRecord::new(
                    name.as_bytes(),
                    CompressionMethod::Stored,
                    0,
                    1,
                    1,
                    offset,
                )
                .encode(),
            );
        }
        let cd_location = Location::new(file.len() as u64, cd.len() as u64);
        file.extend_from_slice(&cd);
        file.extend_from_slice(&EndOfCentralDirectory::encode(
            cd_location,
            names.len() as u64,
        ));
        let map = ZipMap::from_reader(&mut Cursor::new(file), true, Zip64Policy::Allow).unwrap();
        let (buffer, entries, nameless) = map.into_parts();
        CentralDirectory::new(buffer, entries, nameless.len() as u64)
    }

    #[test]
    fn test_delete_unaccounted_data_descriptor() {
        let mut file =
            LocalFileHeader::new(b"dd", CompressionMethod::Stored, 0, 1, 1).encode();
        file[6] = 0x08;
        file.push(b'x');
        file.extend_from_slice(&crate::format::DATA_DESCRIPTOR_SIGNATURE.to_le_bytes());
        file.extend_from_slice(&[0; 12]);
        let mut cd = record("dd", 0).encode();
        cd[8] = 0x08;
        let cd_location = Location::new(file.len() as u64, cd.len() as u64);
        file.extend_from_slice(&cd);
        file.extend_from_slice(&EndOfCentralDirectory::encode(cd_location, 1));

        let map = ZipMap::from_reader(&mut Cursor::new(file), false, Zip64Policy::Allow).unwrap();
        let (buffer, entries, nameless) = map.into_parts();
        let mut cd = CentralDirectory::new(buffer, entries, nameless.len() as u64);
        assert!(cd.delete("dd").unwrap_err().is_illegal_state());
        assert!(cd.contains("dd"));
        assert_eq!(cd.num_entries(), 1);
    }

    fn record(name: &str, offset: u64) -> CentralDirectoryRecord {
        CentralDirectoryRecord::new(name.as_bytes(), CompressionMethod::Stored, 0, 1, 1, offset)
    }

    fn names_in(bytes: &[u8]) -> Vec<String> {
        let mut names = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let record = CentralDirectoryRecord::decode(&bytes[pos..]).unwrap();
            names.push(String::from_utf8(record.name().to_vec()).unwrap());
            pos += record.size() as usize;
        }
        names
    }

    #[test]
    fn test_delete_persisted() {
        let mut cd = parsed(&["a", "b", "c"]);
        let loc = cd.delete("b").unwrap();
        assert_eq!(loc, Location::new(32, 32));
        assert!(!cd.contains("b"));
        assert_eq!(cd.num_entries(), 2);
        assert_eq!(cd.delete("b").unwrap(), Location::INVALID);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let mut cd = CentralDirectory::default();
        assert_eq!(cd.delete("nope").unwrap(), Location::INVALID);
    }

    #[test]
    fn test_delete_pending() {
        let mut cd = CentralDirectory::default();
        let loc = Location::new(0, 40);
        cd.add("new", record("new", 0), loc, Location::new(33, 7))
            .unwrap();
        assert_eq!(cd.delete("new").unwrap(), loc);
        assert_eq!(cd.num_entries(), 0);
    }

    #[test]
    fn test_add_collision() {
        let mut cd = parsed(&["a"]);
        let err = cd
            .add("a", record("a", 0), Location::new(0, 1), Location::new(0, 1))
            .unwrap_err();
        assert!(matches!(err, Error::EntryExists { .. }));

        cd.add("z", record("z", 100), Location::new(100, 32), Location::new(131, 1))
            .unwrap();
        assert!(
            cd.add("z", record("z", 200), Location::new(200, 32), Location::new(231, 1))
                .is_err()
        );
    }

    #[test]
    fn test_list_entries_order() {
        let mut cd = parsed(&["m", "b"]);
        cd.add("z", record("z", 0), Location::new(0, 1), Location::new(0, 1))
            .unwrap();
        cd.add("a", record("a", 0), Location::new(0, 1), Location::new(0, 1))
            .unwrap();
        assert_eq!(cd.list_entries(), vec!["b", "m", "a", "z"]);
    }

    #[test]
    fn test_compaction_keeps_survivors_then_appends() {
        let mut cd = parsed(&["a", "b", "c", "d"]);
        cd.delete("d").unwrap();
        cd.delete("a").unwrap();
        cd.add("e", record("e", 500), Location::new(500, 32), Location::new(531, 1))
            .unwrap();

        let expected = cd.encoded_size();
        let mut out = Vec::new();
        let written = cd.write_to(&mut out).unwrap();
        assert_eq!(written, out.len() as u64);
        assert_eq!(written, expected);
        assert_eq!(names_in(&out), vec!["b", "c", "e"]);
    }

    #[test]
    fn test_write_once() {
        let mut cd = parsed(&["a"]);
        let mut out = Vec::new();
        cd.write_to(&mut out).unwrap();
        assert!(cd.write_to(&mut out).unwrap_err().is_illegal_state());
    }

    #[test]
    fn test_extraction_info() {
        let mut cd = parsed(&["a"]);
        let info = cd.extraction_info("a").unwrap();
        assert_eq!(info.payload_location, Location::new(31, 1));
        assert_eq!(info.compression, CompressionMethod::Stored);

        let deflated = CentralDirectoryRecord::new(b"n", CompressionMethod::Deflate, 0, 3, 9, 64);
        cd.add("n", deflated, Location::new(64, 34), Location::new(95, 3))
            .unwrap();
        let info = cd.extraction_info("n").unwrap();
        assert_eq!(info.compression, CompressionMethod::Deflate);
        assert_eq!(info.payload_location, Location::new(95, 3));
        assert!(cd.extraction_info("missing").is_none());
    }
}
