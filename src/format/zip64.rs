//! Zip64 extension records.
//!
//! When an archive holds more than 65535 entries, or when its Central
//! Directory starts or extends beyond 4 GiB, the 32-bit End of Central
//! Directory can no longer describe it. Its fields are then set to their
//! sentinel values and two records are written just before it:
//!
//! ```text
//! [Central Directory][Zip64 EOCD (56)][Zip64 locator (20)][EOCD (22)]
//! ```
//!
//! Individual entries whose sizes or offset overflow 32 bits carry a Zip64
//! extra field (id `0x0001`) instead.

use std::io::{Read, Seek};

use super::location::Location;
use super::reader::{PutLe, read_at, read_u32_le, read_u64_le, stream_len};
use super::{U16_MAX, U32_MAX, VERSION_ZIP64};
use crate::{Error, Result};

/// Header id of the Zip64 extended information extra field.
pub const EXTRA_ID: u16 = 0x0001;

/// 16-bit sentinel meaning "see the Zip64 record".
pub const SENTINEL_U16: u16 = u16::MAX;

/// 32-bit sentinel meaning "see the Zip64 record".
pub const SENTINEL_U32: u32 = u32::MAX;

/// Whether an archive may use Zip64 structures.
///
/// The policy is fixed when an archive is opened and applies to parsing,
/// adding entries, and writing the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zip64Policy {
    /// Upgrade to Zip64 structures whenever a 32-bit limit is exceeded.
    #[default]
    Allow,
    /// Fail instead of producing or accepting Zip64 structures.
    Forbid,
}

impl Zip64Policy {
    /// Returns `true` for [`Zip64Policy::Forbid`].
    pub fn is_forbid(self) -> bool {
        self == Zip64Policy::Forbid
    }
}

/// Returns `true` if a size or offset cannot be stored in a 32-bit field.
///
/// The sentinel value itself counts as overflowing, otherwise it would be
/// read back as a reference to a Zip64 field.
pub fn exceeds_u32(value: u64) -> bool {
    value >= U32_MAX
}

/// Returns `true` if the footer needs a Zip64 EOCD and locator.
///
/// An offset or size equal to the 32-bit sentinel needs one too, while
/// exactly 65535 entries still fit the 16-bit count.
///
/// ```rust
/// use zipsplice::Location;
/// use zipsplice::format::zip64::needs_zip64_footer;
///
/// assert!(!needs_zip64_footer(65535, Location::new(0, 100)));
/// assert!(needs_zip64_footer(65536, Location::new(0, 100)));
/// assert!(needs_zip64_footer(1, Location::new(1 << 32, 100)));
/// assert!(needs_zip64_footer(1, Location::new(0xFFFF_FFFF, 100)));
/// ```
pub fn needs_zip64_footer(num_entries: u64, cd_location: Location) -> bool {
    num_entries > U16_MAX || exceeds_u32(cd_location.first()) || exceeds_u32(cd_location.size())
}

/// The Zip64 End of Central Directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zip64Eocd {
    num_entries: u64,
    cd_location: Location,
}

impl Zip64Eocd {
    /// Record signature.
    pub const SIGNATURE: u32 = 0x0606_4b50;

    /// Encoded size in bytes.
    pub const SIZE: u64 = 56;

    /// Value of the "size of record" field: everything after it.
    const RECORD_SIZE: u64 = Self::SIZE - 12;

    /// Creates a record describing the given Central Directory.
    pub fn new(num_entries: u64, cd_location: Location) -> Self {
        Self {
            num_entries,
            cd_location,
        }
    }

    /// Total number of Central Directory records.
    pub fn num_entries(&self) -> u64 {
        self.num_entries
    }

    /// Location of the Central Directory.
    pub fn cd_location(&self) -> Location {
        self.cd_location
    }

    /// Encodes the 56-byte record.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE as usize);
        buf.put_u32(Self::SIGNATURE);
        buf.put_u64(Self::RECORD_SIZE);
        buf.put_u16(VERSION_ZIP64); // version made by
        buf.put_u16(VERSION_ZIP64); // version needed
        buf.put_u32(0); // this disk
        buf.put_u32(0); // disk with the central directory
        buf.put_u64(self.num_entries); // entries on this disk
        buf.put_u64(self.num_entries); // total entries
        buf.put_u64(self.cd_location.size());
        buf.put_u64(self.cd_location.first());
        buf
    }

    /// Reads the record at absolute `offset`.
    pub fn parse<R: Read + Seek>(r: &mut R, offset: u64) -> Result<Self> {
        let file_size = stream_len(r)?;
        if offset.checked_add(Self::SIZE).is_none_or(|end| end > file_size) {
            return Err(Error::InvalidFormat(format!(
                "Zip64 locator points outside the file ({:#x})",
                offset
            )));
        }
        let bytes = read_at(r, offset, Self::SIZE as usize)?;
        let mut cursor = &bytes[..];
        if read_u32_le(&mut cursor)? != Self::SIGNATURE {
            return Err(Error::InvalidFormat(format!(
                "Zip64 locator led to bad Zip64 EOCD at {:#x}",
                offset
            )));
        }
        // record size (8), versions (2 + 2), disk numbers (4 + 4)
        cursor = &cursor[20..];
        let _entries_on_disk = read_u64_le(&mut cursor)?;
        let num_entries = read_u64_le(&mut cursor)?;
        let cd_size = read_u64_le(&mut cursor)?;
        let cd_offset = read_u64_le(&mut cursor)?;
        Ok(Self::new(num_entries, Location::new(cd_offset, cd_size)))
    }
}

/// The Zip64 End of Central Directory locator.
///
/// Always found immediately before the 32-bit EOCD.
pub struct Zip64Locator;

impl Zip64Locator {
    /// Record signature.
    pub const SIGNATURE: u32 = 0x0706_4b50;

    /// Encoded size in bytes.
    pub const SIZE: u64 = 20;

    /// Encodes a locator pointing at the Zip64 EOCD at `zip64_eocd_offset`.
    pub fn encode(zip64_eocd_offset: u64) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE as usize);
        buf.put_u32(Self::SIGNATURE);
        buf.put_u32(0); // disk with the Zip64 EOCD
        buf.put_u64(zip64_eocd_offset);
        buf.put_u32(1); // total number of disks
        buf
    }

    /// Looks for a locator just before the EOCD at `eocd_location`.
    ///
    /// Returns the offset of the Zip64 EOCD when the signature matches.
    pub fn find<R: Read + Seek>(r: &mut R, eocd_location: Location) -> Result<Option<u64>> {
        let Some(first) = eocd_location.first().checked_sub(Self::SIZE) else {
            return Ok(None);
        };
        let bytes = read_at(r, first, Self::SIZE as usize)?;
        let mut cursor = &bytes[..];
        if read_u32_le(&mut cursor)? != Self::SIGNATURE {
            return Ok(None);
        }
        let _disk = read_u32_le(&mut cursor)?;
        Ok(Some(read_u64_le(&mut cursor)?))
    }
}
