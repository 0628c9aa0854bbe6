//! Archive layout parser.
//!
//! [`ZipMap`] reconstructs where every entry lives in a ZIP file using only
//! the Central Directory and each entry's Local File Header:
//!
//! 1. Scan the file tail backwards for the End of Central Directory.
//! 2. If a Zip64 locator sits right before it, follow it to the Zip64 EOCD
//!    and take the Central Directory location from there.
//! 3. Decode every Central Directory record.
//! 4. For each record, read its local header to learn the local name and
//!    extra lengths, which give the exact payload start.
//! 5. Optionally probe for data descriptors after each payload.
//!
//! Nothing is decompressed and no payload byte is read.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use super::entry::Entry;
use crate::format::reader::{read_at, stream_len};
use crate::format::zip64::{self, Zip64Eocd, Zip64Locator};
use crate::format::{
    CentralDirectoryRecord, DATA_DESCRIPTOR_SIGNATURE, DATA_DESCRIPTOR_SIZE,
    DATA_DESCRIPTOR_ZIP64_SIZE, EndOfCentralDirectory, LocalFileHeader, Location, Zip64Policy,
};
use crate::{Error, Result};

/// The parsed layout of a ZIP archive.
///
/// # Example
///
/// ```rust,no_run
/// use zipsplice::{ZipMap, Zip64Policy};
///
/// let map = ZipMap::from_path("app.apk", false, Zip64Policy::Allow)?;
/// for (name, entry) in map.entries() {
///     println!("{} at {}", name, entry.payload_location());
/// }
/// println!("central directory: {}", map.cd_location());
/// # Ok::<(), zipsplice::Error>(())
/// ```
#[derive(Debug)]
pub struct ZipMap {
    entries: BTreeMap<String, Entry>,
    cd_buffer: Vec<u8>,
    nameless: Vec<Location>,
    num_records: u64,
    is_zip64: bool,
    payload_location: Location,
    cd_location: Location,
    eocd_location: Location,
}

impl ZipMap {
    /// Parses the archive at `path`.
    ///
    /// With `account_data_descriptors` set, entries flagged with a data
    /// descriptor get an exact on-disk [`Location`] (one extra 4-byte read
    /// each). Without it their location is [`Location::INVALID`], which is
    /// enough for listing and extraction but not for deletion.
    pub fn from_path(
        path: impl AsRef<Path>,
        account_data_descriptors: bool,
        policy: Zip64Policy,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        Self::from_reader(&mut reader, account_data_descriptors, policy).inspect(|map| {
            log::debug!(
                "Parsed {} ({} entries, zip64: {})",
                path.display(),
                map.num_records,
                map.is_zip64
            );
        })
    }

    /// Parses an archive from any seekable reader.
    pub fn from_reader<R: Read + Seek>(
        r: &mut R,
        account_data_descriptors: bool,
        policy: Zip64Policy,
    ) -> Result<Self> {
        let file_size = stream_len(r)?;

        let eocd = EndOfCentralDirectory::find(r)?.ok_or_else(|| {
            Error::InvalidFormat("could not find End of Central Directory".into())
        })?;
        let mut cd_location = eocd.cd_location();
        let mut cd_end_limit = eocd.location().first();

        let mut is_zip64 = false;
        if let Some(zip64_eocd_offset) = Zip64Locator::find(r, eocd.location())? {
            if policy.is_forbid() {
                return Err(Error::zip64_forbidden("cannot parse a Zip64 archive"));
            }
            let zip64_eocd = Zip64Eocd::parse(r, zip64_eocd_offset)?;
            cd_location = zip64_eocd.cd_location();
            cd_end_limit = zip64_eocd_offset;
            is_zip64 = true;
        }

        if cd_location.first().checked_add(cd_location.size()).is_none()
            || cd_location.end() > cd_end_limit
        {
            return Err(Error::InvalidFormat(format!(
                "central directory {} lies outside the file",
                cd_location
            )));
        }
        let cd_size = usize::try_from(cd_location.size()).map_err(|_| {
            Error::InvalidFormat("central directory does not fit in memory".into())
        })?;
        let cd_buffer = read_at(r, cd_location.first(), cd_size)?;

        let mut map = Self {
            entries: BTreeMap::new(),
            cd_buffer: Vec::new(),
            nameless: Vec::new(),
            num_records: 0,
            is_zip64,
            payload_location: Location::new(0, cd_location.first()),
            cd_location,
            eocd_location: eocd.location(),
        };

        let mut pos = 0usize;
        let signature = CentralDirectoryRecord::SIGNATURE.to_le_bytes();
        while pos + 4 <= cd_buffer.len() && cd_buffer[pos..pos + 4] == signature {
            let record_offset = cd_location.first() + pos as u64;
            let record = CentralDirectoryRecord::decode_at(&cd_buffer[pos..], record_offset)?;
            let record_size = record.size();
            let entry = Self::parse_entry(
                r,
                &record,
                Location::new(pos as u64, record_size),
                file_size,
                account_data_descriptors,
            )?;
            check_policy(&entry, record.local_header_offset(), policy)?;
            map.insert(entry)?;
            pos += record_size as usize;
        }

        map.cd_buffer = cd_buffer;
        map.sanity_check()?;
        Ok(map)
    }

    fn parse_entry<R: Read + Seek>(
        r: &mut R,
        record: &CentralDirectoryRecord,
        cd_location: Location,
        file_size: u64,
        account_data_descriptors: bool,
    ) -> Result<Entry> {
        let name = String::from_utf8_lossy(record.name()).into_owned();
        let start = record.local_header_offset();
        if start
            .checked_add(LocalFileHeader::SIZE)
            .is_none_or(|end| end > file_size)
        {
            return Err(Error::corrupt_header(
                start,
                format!("entry '{}' has an invalid local header offset", name),
            ));
        }

        // The local extra field often differs from the central one (alignment
        // padding is only written locally), so the local header is authoritative.
        let local = read_at(r, start, LocalFileHeader::SIZE as usize)?;
        if local[0..4] != LocalFileHeader::SIGNATURE.to_le_bytes() {
            return Err(Error::corrupt_header(
                start,
                format!("entry '{}' does not point at a local file header", name),
            ));
        }
        let name_offset = LocalFileHeader::OFFSET_TO_NAME_LENGTH as usize;
        let local_name_len = u16::from_le_bytes([local[name_offset], local[name_offset + 1]]);
        let local_extra_len = u16::from_le_bytes([local[name_offset + 2], local[name_offset + 3]]);
        if usize::from(local_name_len) != record.name().len() {
            return Err(Error::corrupt_header(
                start,
                format!(
                    "entry '{}' name length differs ({} vs {})",
                    name,
                    local_name_len,
                    record.name().len()
                ),
            ));
        }

        let compression = record.method();
        let payload_size = if compression.is_compressed() {
            record.compressed_size()
        } else {
            record.uncompressed_size()
        };
        let payload_start =
            start + LocalFileHeader::SIZE + u64::from(local_name_len) + u64::from(local_extra_len);
        let Some(end) = payload_start.checked_add(payload_size) else {
            return Err(Error::corrupt_header(
                start,
                format!("entry '{}' payload size overflows", name),
            ));
        };
        let payload_location = Location::from_bounds(payload_start, end);
        let mut location = Location::from_bounds(start, end);

        if record.has_data_descriptor() {
            if account_data_descriptors {
                let mut descriptor_size = if record.has_zip64_sizes() {
                    DATA_DESCRIPTOR_ZIP64_SIZE
                } else {
                    DATA_DESCRIPTOR_SIZE
                };
                if end.saturating_add(4) <= file_size {
                    let marker = read_at(r, end, 4)?;
                    if marker[..] == DATA_DESCRIPTOR_SIGNATURE.to_le_bytes() {
                        descriptor_size += 4;
                    }
                }
                location = Location::new(start, location.size() + descriptor_size);
            } else {
                location = Location::INVALID;
            }
        }

        Ok(Entry {
            name,
            crc32: record.crc(),
            compressed_size: record.compressed_size(),
            size: record.uncompressed_size(),
            compression,
            is_zip64: record.has_zip64_extra(),
            location,
            payload_location,
            cd_location,
        })
    }

    fn insert(&mut self, entry: Entry) -> Result<()> {
        self.num_records += 1;
        if entry.name.is_empty() {
            self.nameless.push(entry.location);
            return Ok(());
        }
        if self.entries.contains_key(&entry.name) {
            return Err(Error::InvalidFormat(format!(
                "duplicate entry name '{}'",
                entry.name
            )));
        }
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Every entry must sit in the payload region and every record inside
    /// the Central Directory.
    fn sanity_check(&self) -> Result<()> {
        let payload_end = self.cd_location.first();
        let cd_size = self.cd_location.size();
        for entry in self.entries.values() {
            if entry.location.is_valid() && entry.location.end() > payload_end {
                return Err(Error::InvalidFormat(format!(
                    "entry '{}' at {} extends past the payload region",
                    entry.name, entry.location
                )));
            }
            if entry.payload_location.end() > payload_end {
                return Err(Error::InvalidFormat(format!(
                    "entry '{}' payload {} extends past the payload region",
                    entry.name, entry.payload_location
                )));
            }
            if entry.cd_location.end() > cd_size {
                return Err(Error::InvalidFormat(format!(
                    "entry '{}' record {} extends past the central directory",
                    entry.name, entry.cd_location
                )));
            }
        }
        Ok(())
    }

    /// Named entries, sorted by name.
    pub fn entries(&self) -> &BTreeMap<String, Entry> {
        &self.entries
    }

    /// Consumes the map, keeping only its entries.
    pub fn into_entries(self) -> BTreeMap<String, Entry> {
        self.entries
    }

    /// Region holding local headers and payloads: `[0, cd start)`.
    pub fn payload_location(&self) -> Location {
        self.payload_location
    }

    /// Central Directory location.
    pub fn cd_location(&self) -> Location {
        self.cd_location
    }

    /// End of Central Directory location.
    pub fn eocd_location(&self) -> Location {
        self.eocd_location
    }

    /// Number of Central Directory records, including nameless ones.
    pub fn num_records(&self) -> u64 {
        self.num_records
    }

    /// Returns `true` if the archive has a Zip64 EOCD.
    pub fn is_zip64(&self) -> bool {
        self.is_zip64
    }

    /// On-disk ranges of records with an empty name.
    pub fn nameless_locations(&self) -> &[Location] {
        &self.nameless
    }

    /// Splits the map into the raw Central Directory, named entries, and
    /// nameless record ranges.
    pub(crate) fn into_parts(self) -> (Vec<u8>, BTreeMap<String, Entry>, Vec<Location>) {
        (self.cd_buffer, self.entries, self.nameless)
    }
}

fn check_policy(entry: &Entry, local_header_offset: u64, policy: Zip64Policy) -> Result<()> {
    if !policy.is_forbid() {
        return Ok(());
    }
    if zip64::exceeds_u32(entry.size)
        || zip64::exceeds_u32(entry.compressed_size)
        || zip64::exceeds_u32(local_header_offset)
    {
        return Err(Error::zip64_forbidden(format!(
            "entry '{}' (size={}, csize={}, offset={})",
            entry.name, entry.size, entry.compressed_size, local_header_offset
        )));
    }
    Ok(())
}
