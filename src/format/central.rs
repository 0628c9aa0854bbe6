//! Central Directory record codec.
//!
//! ```text
//! offset  size  field
//!      0     4  signature (0x02014b50)
//!      4     2  version made by
//!      6     2  version needed to extract
//!      8     2  general purpose flags
//!     10     2  compression method
//!     12     2  last modification time
//!     14     2  last modification date
//!     16     4  CRC-32
//!     20     4  compressed size
//!     24     4  uncompressed size
//!     28     2  name length
//!     30     2  extra field length
//!     32     2  comment length
//!     34     2  disk number start
//!     36     2  internal attributes
//!     38     4  external attributes
//!     42     4  local header offset
//!     46     n  name, extra field, comment
//! ```
//!
//! Unlike the local header, the Zip64 extra field of a Central Directory
//! record only holds the fields whose 32-bit slot is the sentinel, in the
//! order uncompressed size, compressed size, local header offset.

use super::reader::{PutLe, read_bytes, read_u16_le, read_u32_le, read_u64_le};
use super::zip64::{self, EXTRA_ID, SENTINEL_U32};
use super::{DEFAULT_DATE, DEFAULT_TIME, VERSION_DEFAULT, VERSION_ZIP64};
use crate::codec::CompressionMethod;
use crate::{Error, Result};

/// A Central Directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryRecord {
    version_made_by: u16,
    version_needed: u16,
    flags: u16,
    method: CompressionMethod,
    crc: u32,
    compressed_size: u64,
    uncompressed_size: u64,
    local_header_offset: u64,
    name: Vec<u8>,
    extra_length: u16,
    comment_length: u16,
    has_zip64_extra: bool,
    sizes_zip64: bool,
}

impl CentralDirectoryRecord {
    /// Record signature.
    pub const SIGNATURE: u32 = 0x0201_4b50;

    /// Fixed part of the record.
    pub const SIZE: u64 = 46;

    /// Creates a record for an entry whose local header starts at
    /// `local_header_offset`.
    pub fn new(
        name: &[u8],
        method: CompressionMethod,
        crc: u32,
        compressed_size: u64,
        uncompressed_size: u64,
        local_header_offset: u64,
    ) -> Self {
        let mut record = Self {
            version_made_by: VERSION_DEFAULT,
            version_needed: VERSION_DEFAULT,
            flags: 0,
            method,
            crc,
            compressed_size,
            uncompressed_size,
            local_header_offset,
            name: name.to_vec(),
            extra_length: 0,
            comment_length: 0,
            has_zip64_extra: false,
            sizes_zip64: zip64::exceeds_u32(compressed_size)
                || zip64::exceeds_u32(uncompressed_size),
        };
        let zip64_len = record.zip64_payload_len();
        if zip64_len > 0 {
            record.version_made_by = VERSION_ZIP64;
            record.version_needed = VERSION_ZIP64;
            record.extra_length = 4 + zip64_len;
            record.has_zip64_extra = true;
        }
        record
    }

    fn zip64_payload_len(&self) -> u16 {
        [
            self.uncompressed_size,
            self.compressed_size,
            self.local_header_offset,
        ]
        .iter()
        .filter(|&&v| zip64::exceeds_u32(v))
        .count() as u16
            * 8
    }

    /// Encoded size of this record.
    pub fn size(&self) -> u64 {
        Self::SIZE
            + self.name.len() as u64
            + u64::from(self.extra_length)
            + u64::from(self.comment_length)
    }

    /// Version made by.
    pub fn version_made_by(&self) -> u16 {
        self.version_made_by
    }

    /// Version needed to extract.
    pub fn version_needed(&self) -> u16 {
        self.version_needed
    }

    /// General purpose flags.
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Returns `true` if a data descriptor follows the payload.
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & super::DATA_DESCRIPTOR_FLAG != 0
    }

    /// Compression method.
    pub fn method(&self) -> CompressionMethod {
        self.method
    }

    /// CRC-32 of the uncompressed bytes.
    pub fn crc(&self) -> u32 {
        self.crc
    }

    /// Payload size as stored, resolved through Zip64 if needed.
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    /// Size once decompressed, resolved through Zip64 if needed.
    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    /// Offset of the entry's local header, resolved through Zip64 if needed.
    pub fn local_header_offset(&self) -> u64 {
        self.local_header_offset
    }

    /// Raw name bytes.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Returns `true` if the record carries a Zip64 extra field.
    pub fn has_zip64_extra(&self) -> bool {
        self.has_zip64_extra
    }

    /// Returns `true` if a size was resolved through the Zip64 extra field,
    /// in which case a data descriptor carries 8-byte sizes.
    pub fn has_zip64_sizes(&self) -> bool {
        self.sizes_zip64
    }

    /// Encodes a record built with [`CentralDirectoryRecord::new`].
    ///
    /// Extra fields other than Zip64 and comments of decoded records are
    /// not retained and must be copied from the original bytes instead.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size() as usize);
        let clamp = |v: u64| {
            if zip64::exceeds_u32(v) {
                SENTINEL_U32
            } else {
                v as u32
            }
        };
        let zip64_len = self.zip64_payload_len();

        buf.put_u32(Self::SIGNATURE);
        buf.put_u16(self.version_made_by);
        buf.put_u16(self.version_needed);
        buf.put_u16(self.flags);
        buf.put_u16(self.method.as_u16());
        buf.put_u16(DEFAULT_TIME);
        buf.put_u16(DEFAULT_DATE);
        buf.put_u32(self.crc);
        buf.put_u32(clamp(self.compressed_size));
        buf.put_u32(clamp(self.uncompressed_size));
        buf.put_u16(self.name.len() as u16);
        buf.put_u16(if zip64_len > 0 { 4 + zip64_len } else { 0 });
        buf.put_u16(0); // comment length
        buf.put_u16(0); // disk number start
        buf.put_u16(0); // internal attributes
        buf.put_u32(0); // external attributes
        buf.put_u32(clamp(self.local_header_offset));
        buf.extend_from_slice(&self.name);
        if zip64_len > 0 {
            buf.put_u16(EXTRA_ID);
            buf.put_u16(zip64_len);
            for value in [
                self.uncompressed_size,
                self.compressed_size,
                self.local_header_offset,
            ] {
                if zip64::exceeds_u32(value) {
                    buf.put_u64(value);
                }
            }
        }
        buf
    }

    /// Decodes a record from the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_at(bytes, 0)
    }

    /// Decodes a record from the start of `bytes`, reporting errors against
    /// the absolute file offset `offset`.
    pub(crate) fn decode_at(bytes: &[u8], offset: u64) -> Result<Self> {
        let truncated = |_| Error::corrupt_header(offset, "truncated central directory record");
        let mut r = bytes;
        let signature = read_u32_le(&mut r).map_err(truncated)?;
        if signature != Self::SIGNATURE {
            return Err(Error::corrupt_header(
                offset,
                format!("bad central directory signature {:#010x}", signature),
            ));
        }
        let version_made_by = read_u16_le(&mut r).map_err(truncated)?;
        let version_needed = read_u16_le(&mut r).map_err(truncated)?;
        let flags = read_u16_le(&mut r).map_err(truncated)?;
        let method = CompressionMethod::from_u16(read_u16_le(&mut r).map_err(truncated)?);
        let _time = read_u16_le(&mut r).map_err(truncated)?;
        let _date = read_u16_le(&mut r).map_err(truncated)?;
        let crc = read_u32_le(&mut r).map_err(truncated)?;
        let compressed_size = u64::from(read_u32_le(&mut r).map_err(truncated)?);
        let uncompressed_size = u64::from(read_u32_le(&mut r).map_err(truncated)?);
        let name_len = read_u16_le(&mut r).map_err(truncated)?;
        let extra_length = read_u16_le(&mut r).map_err(truncated)?;
        let comment_length = read_u16_le(&mut r).map_err(truncated)?;
        let _disk = read_u16_le(&mut r).map_err(truncated)?;
        let _internal = read_u16_le(&mut r).map_err(truncated)?;
        let _external = read_u32_le(&mut r).map_err(truncated)?;
        let local_header_offset = u64::from(read_u32_le(&mut r).map_err(truncated)?);
        let name = read_bytes(&mut r, usize::from(name_len)).map_err(truncated)?;
        let extra = read_bytes(&mut r, usize::from(extra_length)).map_err(truncated)?;
        if r.len() < usize::from(comment_length) {
            return Err(Error::corrupt_header(
                offset,
                "truncated central directory comment",
            ));
        }

        let mut record = Self {
            version_made_by,
            version_needed,
            flags,
            method,
            crc,
            compressed_size,
            uncompressed_size,
            local_header_offset,
            name,
            extra_length,
            comment_length,
            has_zip64_extra: false,
            sizes_zip64: false,
        };
        record.apply_extra(&extra, offset)?;
        Ok(record)
    }

    /// Walks the extra field, applying a Zip64 block and skipping the rest.
    fn apply_extra(&mut self, mut extra: &[u8], offset: u64) -> Result<()> {
        while extra.len() >= 4 {
            let id = u16::from_le_bytes([extra[0], extra[1]]);
            let len = usize::from(u16::from_le_bytes([extra[2], extra[3]]));
            extra = &extra[4..];
            let data = &extra[..len.min(extra.len())];
            if id == EXTRA_ID {
                self.apply_zip64(data, offset)?;
            }
            if extra.len() < len {
                break;
            }
            extra = &extra[len..];
        }
        Ok(())
    }

    fn apply_zip64(&mut self, mut data: &[u8], offset: u64) -> Result<()> {
        let name = String::from_utf8_lossy(&self.name).into_owned();
        let bad = |_| {
            Error::corrupt_header(offset, format!("bad Zip64 extra field for entry '{}'", name))
        };
        let sentinel = u64::from(SENTINEL_U32);
        self.has_zip64_extra = true;
        if self.uncompressed_size == sentinel {
            self.uncompressed_size = read_u64_le(&mut data).map_err(bad)?;
            self.sizes_zip64 = true;
        }
        if self.compressed_size == sentinel {
            self.compressed_size = read_u64_le(&mut data).map_err(bad)?;
            self.sizes_zip64 = true;
        }
        if self.local_header_offset == sentinel {
            self.local_header_offset = read_u64_le(&mut data).map_err(bad)?;
        }
        Ok(())
    }
}
