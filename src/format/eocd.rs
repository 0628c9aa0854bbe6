//! End of Central Directory record.
//!
//! ```text
//! offset  size  field
//!      0     4  signature (0x06054b50)
//!      4     2  number of this disk
//!      6     2  disk where the central directory starts
//!      8     2  entries on this disk
//!     10     2  total entries
//!     12     4  central directory size
//!     16     4  central directory offset
//!     20     2  comment length
//!     22     n  comment
//! ```
//!
//! The record sits at the very end of the file, followed only by its
//! comment, so it is found by scanning the last `22 + 65535` bytes
//! backwards for its signature.

use std::io::{Read, Seek};

use super::location::Location;
use super::reader::{PutLe, read_at, read_u16_le, read_u32_le, stream_len};
use super::zip64::{self, SENTINEL_U16, SENTINEL_U32};
use super::U16_MAX;
use crate::Result;

/// A parsed End of Central Directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    location: Location,
    cd_location: Location,
    num_entries: u16,
}

impl EndOfCentralDirectory {
    /// Record signature.
    pub const SIGNATURE: u32 = 0x0605_4b50;

    /// Encoded size without comment.
    pub const SIZE: u64 = 22;

    /// How far from the end of the file the record may start.
    pub const MAX_SEARCH: u64 = Self::SIZE + U16_MAX;

    /// Where the record itself was found.
    pub fn location(&self) -> Location {
        self.location
    }

    /// Central Directory location as stored in the 32-bit fields.
    pub fn cd_location(&self) -> Location {
        self.cd_location
    }

    /// Entry count as stored in the 16-bit field.
    pub fn num_entries(&self) -> u16 {
        self.num_entries
    }

    /// Searches the tail of a stream for the record.
    ///
    /// Returns `None` if no signature is found in the last 65557 bytes.
    pub fn find<R: Read + Seek>(r: &mut R) -> Result<Option<Self>> {
        let file_size = stream_len(r)?;
        if file_size < Self::SIZE {
            return Ok(None);
        }
        let to_read = file_size.min(Self::MAX_SEARCH);
        let start = file_size - to_read;
        let buf = read_at(r, start, to_read as usize)?;

        let signature = Self::SIGNATURE.to_le_bytes();
        let last_candidate = buf.len() - Self::SIZE as usize;
        for pos in (0..=last_candidate).rev() {
            if buf[pos..pos + 4] != signature {
                continue;
            }
            let mut fields = &buf[pos + 4..];
            let _disk = read_u16_le(&mut fields)?;
            let _cd_disk = read_u16_le(&mut fields)?;
            let _entries_on_disk = read_u16_le(&mut fields)?;
            let num_entries = read_u16_le(&mut fields)?;
            let cd_size = u64::from(read_u32_le(&mut fields)?);
            let cd_offset = u64::from(read_u32_le(&mut fields)?);
            return Ok(Some(Self {
                location: Location::new(start + pos as u64, Self::SIZE),
                cd_location: Location::new(cd_offset, cd_size),
                num_entries,
            }));
        }
        Ok(None)
    }

    /// Encodes a record for a Central Directory holding `num_entries`
    /// records at `cd_location`.
    ///
    /// Fields that do not fit are written as sentinels; the caller is then
    /// expected to have written the Zip64 EOCD and locator first.
    pub fn encode(cd_location: Location, num_entries: u64) -> Vec<u8> {
        let is_zip64 = zip64::needs_zip64_footer(num_entries, cd_location);
        let (entries, size, offset) = if is_zip64 {
            (SENTINEL_U16, SENTINEL_U32, SENTINEL_U32)
        } else {
            (
                num_entries as u16,
                cd_location.size() as u32,
                cd_location.first() as u32,
            )
        };

        let mut buf = Vec::with_capacity(Self::SIZE as usize);
        buf.put_u32(Self::SIGNATURE);
        buf.put_u16(0); // this disk
        buf.put_u16(0); // disk with the central directory
        buf.put_u16(entries);
        buf.put_u16(entries);
        buf.put_u32(size);
        buf.put_u32(offset);
        buf.put_u16(0); // comment length
        buf
    }
}
