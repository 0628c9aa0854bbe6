//! The in-place archive engine.
//!
//! A [`ZipArchive`] writes every added entry to its final position as soon
//! as it is added, placing it in a hole left by a deleted entry when one is
//! large enough, or at the end of the payload region otherwise. Nothing else
//! is touched until [`ZipArchive::close`], which fills the remaining holes
//! with nameless filler entries, writes the Central Directory after the last
//! entry, then the footers, and truncates the file.
//!
//! Entries that are neither deleted nor added are never read nor moved.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::central_directory::CentralDirectory;
use super::free_store::FreeStore;
use super::options::ArchiveOptions;
use super::source::{ByteSource, Source};
use super::zip_source::ZipSource;
use crate::format::local::encode_virtual_entry;
use crate::format::zip64::{self, Zip64Eocd, Zip64Locator};
use crate::format::{
    CentralDirectoryRecord, EndOfCentralDirectory, LocalFileHeader, Location, U16_MAX,
    Zip64Policy,
};
use crate::fs::{ZipReader, ZipWriter};
use crate::read::{Entry, ZipMap};
use crate::{Error, Result};

/// The three regions of a closed archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZipInfo {
    /// Local headers and payloads, from offset 0 to the Central Directory.
    pub payload: Location,
    /// The Central Directory.
    pub cd: Location,
    /// The End of Central Directory record.
    pub eocd: Location,
}

impl Default for ZipInfo {
    fn default() -> Self {
        Self {
            payload: Location::INVALID,
            cd: Location::INVALID,
            eocd: Location::INVALID,
        }
    }
}

/// A ZIP archive opened for in-place editing.
///
/// Additions are written immediately; deletions only release space. The
/// archive becomes a valid ZIP file again once [`close`](Self::close) has
/// returned.
///
/// Replacing an entry requires deleting it first:
///
/// ```rust,no_run
/// use zipsplice::{ByteSource, ZipArchive};
///
/// let mut archive = ZipArchive::open("app.zip")?;
/// archive.delete("config.json")?;
/// archive.add(ByteSource::new(br#"{"debug":false}"#.to_vec(), "config.json", 6)?)?;
/// let info = archive.close()?;
/// println!("central directory at {}", info.cd);
/// # Ok::<(), zipsplice::Error>(())
/// ```
#[derive(Debug)]
pub struct ZipArchive {
    path: PathBuf,
    options: ArchiveOptions,
    free_store: FreeStore,
    cd: CentralDirectory,
    writer: ZipWriter,
    reader: ZipReader,
    info: ZipInfo,
    closed: bool,
    modified: bool,
}

impl ZipArchive {
    /// Opens the archive at `path`, or starts a new one if the file is
    /// missing or empty. Zip64 is allowed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, ArchiveOptions::default())
    }

    /// Opens the archive at `path` with the given options.
    ///
    /// An existing archive is parsed up front; the file itself is only
    /// opened for writing when an entry is added or the archive is closed.
    pub fn open_with_options(path: impl AsRef<Path>, options: ArchiveOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existing = match std::fs::metadata(&path) {
            Ok(metadata) => metadata.len() > 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        let (free_store, cd, info) = if existing {
            let map = ZipMap::from_path(&path, true, options.zip64_policy)?;
            let info = ZipInfo {
                payload: map.payload_location(),
                cd: map.cd_location(),
                eocd: map.eocd_location(),
            };
            let used: Vec<Location> = map
                .entries()
                .values()
                .map(Entry::location)
                .chain(map.nameless_locations().iter().copied())
                .collect();
            let free_store = FreeStore::new(used);
            let (buffer, entries, nameless) = map.into_parts();
            let cd = CentralDirectory::new(buffer, entries, nameless.len() as u64);
            (free_store, cd, info)
        } else {
            log::debug!("Starting new archive {}", path.display());
            (
                FreeStore::default(),
                CentralDirectory::default(),
                ZipInfo::default(),
            )
        };

        Ok(Self {
            writer: ZipWriter::new(&path),
            reader: ZipReader::new(&path),
            path,
            options,
            free_store,
            cd,
            info,
            closed: false,
            modified: false,
        })
    }

    /// Lists the entries of the archive at `path` without opening it for
    /// editing.
    pub fn list_entries_in(path: impl AsRef<Path>) -> Result<BTreeMap<String, Entry>> {
        Ok(ZipMap::from_path(path, false, Zip64Policy::Allow)?.into_entries())
    }

    /// Names of all entries: existing ones first, then added ones, each in
    /// name order.
    pub fn list_entries(&self) -> Vec<String> {
        self.cd.list_entries()
    }

    /// Returns the decompressed content of `name`, or `None` if there is no
    /// such entry.
    pub fn get_content(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        let Some(info) = self.cd.extraction_info(name) else {
            return Ok(None);
        };
        let payload = self
            .reader
            .read_exact_at(info.payload_location.first(), info.payload_location.size())?;
        Ok(Some(info.compression.decode(payload)?))
    }

    /// Writes `source` as a new entry.
    pub fn add(&mut self, source: ByteSource) -> Result<()> {
        self.ensure_open()?;
        let mut source = source.into_source();
        self.write_source(&mut source, None)
    }

    /// Copies the selected entries of another archive.
    ///
    /// The other archive is open only for the duration of this call.
    pub fn add_zip_source(&mut self, source: ZipSource) -> Result<()> {
        self.ensure_open()?;
        let mut origin = File::open(source.path())?;
        for mut selected in source.into_selected() {
            self.write_source(&mut selected, Some(&mut origin))?;
        }
        Ok(())
    }

    /// Removes `name`. Deleting a name that does not exist does nothing.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        let location = self.cd.delete(name)?;
        if location.is_valid() {
            log::trace!("deleted '{}', releasing {}", name, location);
            self.free_store.free(location);
            self.modified = true;
        }
        Ok(())
    }

    /// Writes the Central Directory and footers, then releases the file.
    ///
    /// An existing archive that was not modified is left byte-for-byte
    /// untouched. The file handles are released even if writing fails.
    pub fn close(&mut self) -> Result<ZipInfo> {
        self.ensure_open()?;
        self.closed = true;
        let result = self.write_archive();
        let released = self.writer.close();
        self.reader.close();
        let info = result?;
        released?;
        Ok(info)
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Path of the archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::ArchiveClosed {
                path: self.path.display().to_string(),
            });
        }
        Ok(())
    }

    fn write_source(&mut self, source: &mut Source, mut origin: Option<&mut File>) -> Result<()> {
        source.prepare(origin.as_deref_mut())?;

        let name = source.name();
        if name.len() as u64 > U16_MAX {
            return Err(Error::NameTooLong {
                name: name.to_string(),
                length: name.len(),
            });
        }
        if self.cd.contains(name) {
            return Err(Error::EntryExists {
                name: name.to_string(),
            });
        }

        let sizing = source.sizing();
        let forbid = self.options.zip64_policy.is_forbid();
        let mut header = LocalFileHeader::new(
            name.as_bytes(),
            sizing.method,
            sizing.crc,
            sizing.compressed_size,
            sizing.uncompressed_size,
        );
        if forbid && header.is_zip64() {
            return Err(Error::zip64_forbidden(format!(
                "entry '{}' is {} bytes ({} compressed)",
                name, sizing.uncompressed_size, sizing.compressed_size
            )));
        }

        let header_size = header.size();
        let needed = header_size
            .checked_add(sizing.compressed_size)
            .ok_or_else(|| Error::IllegalState(format!("entry '{}' is too large", name)))?;
        let location = if source.is_aligned() {
            self.free_store
                .alloc(needed, header_size, source.alignment())
        } else {
            self.free_store.ualloc(needed)
        };
        if let Err(e) = header.set_padding(location.size() - needed) {
            self.free_store.free(location);
            return Err(e);
        }
        if forbid && zip64::exceeds_u32(location.first()) {
            self.free_store.free(location);
            return Err(Error::zip64_forbidden(format!(
                "entry '{}' would start at {:#x}",
                name,
                location.first()
            )));
        }

        self.modified = true;
        self.writer.set_position(location.first())?;
        self.writer.write_all(&header.encode())?;
        let payload_first = location.first() + header.encoded_size();
        let written = source.write_payload(&mut self.writer, origin)?;
        let payload_location = Location::new(payload_first, written);

        let record = CentralDirectoryRecord::new(
            name.as_bytes(),
            sizing.method,
            sizing.crc,
            sizing.compressed_size,
            sizing.uncompressed_size,
            location.first(),
        );
        self.cd.add(name, record, location, payload_location)?;
        log::trace!(
            "wrote '{}' at {} (payload {}, {})",
            name,
            location,
            payload_location,
            sizing.method
        );
        Ok(())
    }

    fn write_archive(&mut self) -> Result<ZipInfo> {
        if !self.modified && self.info.eocd.is_valid() {
            log::debug!("{} not modified, leaving it untouched", self.path.display());
            return Ok(self.info);
        }

        let num_entries = self.cd.num_entries();
        let cd_first = self.free_store.last_free_location().first();
        let cd_location = Location::new(cd_first, self.cd.encoded_size());
        let needs_zip64 = zip64::needs_zip64_footer(num_entries, cd_location);
        if needs_zip64 && self.options.zip64_policy.is_forbid() {
            return Err(Error::zip64_forbidden(format!(
                "{} entries, central directory at {}",
                num_entries, cd_location
            )));
        }

        let free_locations = self.free_store.free_locations();
        if let Some((_, holes)) = free_locations.split_last() {
            for hole in holes {
                self.fill_hole(*hole)?;
            }
        }

        self.writer.set_position(cd_first)?;
        self.cd.write_to(&mut self.writer)?;

        let mut position = cd_location.end();
        if needs_zip64 {
            let zip64_eocd = Zip64Eocd::new(num_entries, cd_location);
            self.writer.write_all(&zip64_eocd.encode())?;
            self.writer.write_all(&Zip64Locator::encode(position))?;
            position += Zip64Eocd::SIZE + Zip64Locator::SIZE;
        }
        let eocd_location = Location::new(position, EndOfCentralDirectory::SIZE);
        self.writer
            .write_all(&EndOfCentralDirectory::encode(cd_location, num_entries))?;
        self.writer.truncate(eocd_location.end())?;

        self.info = ZipInfo {
            payload: Location::new(0, cd_first),
            cd: cd_location,
            eocd: eocd_location,
        };
        log::debug!(
            "Closed {} ({} entries, central directory {}, zip64: {})",
            self.path.display(),
            num_entries,
            cd_location,
            needs_zip64
        );
        Ok(self.info)
    }

    /// Covers `hole` with nameless entries so the payload region can be
    /// scanned header to header.
    fn fill_hole(&mut self, hole: Location) -> Result<()> {
        if hole.size() < LocalFileHeader::SIZE {
            log::warn!(
                "{}: {}-byte gap at {:#x} is too small for a filler entry",
                self.path.display(),
                hole.size(),
                hole.first()
            );
            return Ok(());
        }
        let mut remaining = hole.size();
        while remaining > 0 {
            let size = if remaining <= LocalFileHeader::VIRTUAL_ENTRY_MAX_SIZE {
                remaining
            } else {
                U16_MAX
            };
            let filler = encode_virtual_entry(size)?;
            self.writer.write_all_at(&filler, hole.end() - remaining)?;
            remaining -= size;
        }
        Ok(())
    }
}
