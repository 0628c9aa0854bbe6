//! Local File Header codec.
//!
//! ```text
//! offset  size  field
//!      0     4  signature (0x04034b50)
//!      4     2  version needed to extract
//!      6     2  general purpose flags
//!      8     2  compression method
//!     10     2  last modification time
//!     12     2  last modification date
//!     14     4  CRC-32
//!     18     4  compressed size
//!     22     4  uncompressed size
//!     26     2  name length
//!     28     2  extra field length
//!     30     n  name, then extra field
//! ```
//!
//! A header with an empty name and an extra field made of zeros is a
//! *virtual entry*. It is never referenced by the Central Directory and only
//! exists so that a linear scan of the file walks from one record to the
//! next across reclaimed space.

use super::reader::{PutLe, read_bytes, read_u16_le, read_u32_le, read_u64_le};
use super::zip64::{self, EXTRA_ID, SENTINEL_U32};
use super::{DEFAULT_DATE, DEFAULT_TIME, U16_MAX, VERSION_DEFAULT, VERSION_ZIP64};
use crate::codec::CompressionMethod;
use crate::{Error, Result};

/// Zip64 extra field payload in a local header: uncompressed then compressed size.
const ZIP64_PAYLOAD_SIZE: u16 = 16;

/// Zip64 extra field including its 4-byte id/length prefix.
const ZIP64_EXTRA_SIZE: u64 = 4 + ZIP64_PAYLOAD_SIZE as u64;

/// A Local File Header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    version_needed: u16,
    flags: u16,
    method: CompressionMethod,
    crc: u32,
    compressed_size: u64,
    uncompressed_size: u64,
    name: Vec<u8>,
    padding: u16,
}

impl LocalFileHeader {
    /// Header signature.
    pub const SIGNATURE: u32 = 0x0403_4b50;

    /// Fixed part of the header.
    pub const SIZE: u64 = 30;

    /// Offset of the name length field.
    pub const OFFSET_TO_NAME_LENGTH: u64 = 26;

    /// Largest hole a single virtual entry can cover.
    pub const VIRTUAL_ENTRY_MAX_SIZE: u64 = Self::SIZE + U16_MAX;

    /// Creates a header for a new entry.
    ///
    /// Sizes that do not fit 32 bits switch the header to Zip64.
    pub fn new(
        name: &[u8],
        method: CompressionMethod,
        crc: u32,
        compressed_size: u64,
        uncompressed_size: u64,
    ) -> Self {
        let is_zip64 =
            zip64::exceeds_u32(compressed_size) || zip64::exceeds_u32(uncompressed_size);
        Self {
            version_needed: if is_zip64 {
                VERSION_ZIP64
            } else {
                VERSION_DEFAULT
            },
            flags: 0,
            method,
            crc,
            compressed_size,
            uncompressed_size,
            name: name.to_vec(),
            padding: 0,
        }
    }

    /// Returns `true` if the sizes are carried by a Zip64 extra field.
    pub fn is_zip64(&self) -> bool {
        zip64::exceeds_u32(self.compressed_size) || zip64::exceeds_u32(self.uncompressed_size)
    }

    /// Header size without alignment padding.
    pub fn size(&self) -> u64 {
        let extra = if self.is_zip64() { ZIP64_EXTRA_SIZE } else { 0 };
        Self::SIZE + self.name.len() as u64 + extra
    }

    /// Header size including alignment padding.
    pub fn encoded_size(&self) -> u64 {
        self.size() + u64::from(self.padding)
    }

    /// Adds `padding` zero bytes to the extra field.
    ///
    /// Fails if the extra field would no longer fit its 16-bit length.
    pub fn set_padding(&mut self, padding: u64) -> Result<()> {
        let extra = if self.is_zip64() { ZIP64_EXTRA_SIZE } else { 0 };
        if extra + padding > U16_MAX {
            return Err(Error::IllegalState(format!(
                "padding cannot be more than {} bytes (requested {})",
                U16_MAX - extra,
                padding
            )));
        }
        self.padding = padding as u16;
        Ok(())
    }

    /// Version needed to extract.
    pub fn version_needed(&self) -> u16 {
        self.version_needed
    }

    /// General purpose flags.
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Compression method.
    pub fn method(&self) -> CompressionMethod {
        self.method
    }

    /// CRC-32 of the uncompressed bytes.
    pub fn crc(&self) -> u32 {
        self.crc
    }

    /// Payload size as stored.
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    /// Size once decompressed.
    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    /// Raw name bytes.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Extra bytes other than the Zip64 field.
    pub fn padding(&self) -> u16 {
        self.padding
    }

    /// Encodes the header, name, and extra field.
    ///
    /// Callers must have checked that the name fits 65535 bytes.
    pub fn encode(&self) -> Vec<u8> {
        let is_zip64 = self.is_zip64();
        let zip64_extra = if is_zip64 { ZIP64_EXTRA_SIZE } else { 0 };
        let extra_len = zip64_extra + u64::from(self.padding);
        let mut buf = Vec::with_capacity(self.encoded_size() as usize);

        buf.put_u32(Self::SIGNATURE);
        buf.put_u16(self.version_needed);
        buf.put_u16(self.flags);
        buf.put_u16(self.method.as_u16());
        buf.put_u16(DEFAULT_TIME);
        buf.put_u16(DEFAULT_DATE);
        buf.put_u32(self.crc);
        if is_zip64 {
            buf.put_u32(SENTINEL_U32);
            buf.put_u32(SENTINEL_U32);
        } else {
            buf.put_u32(self.compressed_size as u32);
            buf.put_u32(self.uncompressed_size as u32);
        }
        buf.put_u16(self.name.len() as u16);
        buf.put_u16(extra_len as u16);
        buf.extend_from_slice(&self.name);
        if is_zip64 {
            buf.put_u16(EXTRA_ID);
            buf.put_u16(ZIP64_PAYLOAD_SIZE);
            buf.put_u64(self.uncompressed_size);
            buf.put_u64(self.compressed_size);
        }
        buf.resize(buf.len() + usize::from(self.padding), 0);
        buf
    }

    /// Decodes a header from the start of `bytes`.
    ///
    /// Sizes set to the 32-bit sentinel are taken from the Zip64 extra
    /// field. Every other extra byte is reported as padding.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let truncated = |_| Error::corrupt_header(0, "truncated local file header");
        let mut r = bytes;
        let signature = read_u32_le(&mut r).map_err(truncated)?;
        if signature != Self::SIGNATURE {
            return Err(Error::corrupt_header(
                0,
                format!("bad local file header signature {:#010x}", signature),
            ));
        }
        let version_needed = read_u16_le(&mut r).map_err(truncated)?;
        let flags = read_u16_le(&mut r).map_err(truncated)?;
        let method = CompressionMethod::from_u16(read_u16_le(&mut r).map_err(truncated)?);
        let _time = read_u16_le(&mut r).map_err(truncated)?;
        let _date = read_u16_le(&mut r).map_err(truncated)?;
        let crc = read_u32_le(&mut r).map_err(truncated)?;
        let mut compressed_size = u64::from(read_u32_le(&mut r).map_err(truncated)?);
        let mut uncompressed_size = u64::from(read_u32_le(&mut r).map_err(truncated)?);
        let name_len = read_u16_le(&mut r).map_err(truncated)?;
        let extra_len = read_u16_le(&mut r).map_err(truncated)?;
        let name = read_bytes(&mut r, usize::from(name_len)).map_err(truncated)?;
        let extra = read_bytes(&mut r, usize::from(extra_len)).map_err(truncated)?;

        let mut padding = extra_len;
        let needs_extra = compressed_size == u64::from(SENTINEL_U32)
            || uncompressed_size == u64::from(SENTINEL_U32);
        if needs_extra {
            let mut e = &extra[..];
            let id = read_u16_le(&mut e).map_err(truncated)?;
            let len = read_u16_le(&mut e).map_err(truncated)?;
            if id != EXTRA_ID || len < ZIP64_PAYLOAD_SIZE {
                return Err(Error::corrupt_header(0, "missing Zip64 extra field"));
            }
            uncompressed_size = read_u64_le(&mut e).map_err(truncated)?;
            compressed_size = read_u64_le(&mut e).map_err(truncated)?;
            padding = extra_len.saturating_sub(4 + len);
        }

        Ok(Self {
            version_needed,
            flags,
            method,
            crc,
            compressed_size,
            uncompressed_size,
            name,
            padding,
        })
    }
}

/// Encodes a virtual entry covering exactly `size` bytes.
///
/// `size` must lie in `30..=65565`.
///
/// ```rust
/// use zipsplice::format::local::encode_virtual_entry;
///
/// let entry = encode_virtual_entry(100).unwrap();
/// assert_eq!(entry.len(), 100);
/// assert!(encode_virtual_entry(29).is_err());
/// ```
pub fn encode_virtual_entry(size: u64) -> Result<Vec<u8>> {
    if size < LocalFileHeader::SIZE {
        return Err(Error::IllegalState(format!(
            "not enough space for virtual entry ({} bytes)",
            size
        )));
    }
    if size > LocalFileHeader::VIRTUAL_ENTRY_MAX_SIZE {
        return Err(Error::IllegalState(format!(
            "virtual entry cannot span {} bytes",
            size
        )));
    }
    let mut buf = Vec::with_capacity(size as usize);
    buf.put_u32(LocalFileHeader::SIGNATURE);
    buf.put_u16(0); // version needed
    buf.put_u16(0); // flags
    buf.put_u16(CompressionMethod::Stored.as_u16());
    buf.put_u16(DEFAULT_TIME);
    buf.put_u16(DEFAULT_DATE);
    buf.put_u32(0); // CRC-32
    buf.put_u32(0); // compressed size
    buf.put_u32(0); // uncompressed size
    buf.put_u16(0); // name length
    buf.put_u16((size - LocalFileHeader::SIZE) as u16);
    buf.resize(size as usize, 0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let lfh = LocalFileHeader::new(b"a.txt", CompressionMethod::Deflate, 0xDEADBEEF, 7, 5);
        let bytes = lfh.encode();
        assert_eq!(bytes.len(), 35);
        assert_eq!(lfh.size(), 35);
        assert_eq!(&bytes[0..4], &[0x50, 0x4b, 0x03, 0x04]);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), VERSION_DEFAULT);
        assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), 8);
        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), DEFAULT_DATE);
        assert_eq!(
            u32::from_le_bytes(bytes[14..18].try_into().unwrap()),
            0xDEADBEEF
        );
        assert_eq!(u32::from_le_bytes(bytes[18..22].try_into().unwrap()), 7);
        assert_eq!(u32::from_le_bytes(bytes[22..26].try_into().unwrap()), 5);
        assert_eq!(u16::from_le_bytes([bytes[26], bytes[27]]), 5);
        assert_eq!(u16::from_le_bytes([bytes[28], bytes[29]]), 0);
        assert_eq!(&bytes[30..], b"a.txt");
    }

    #[test]
    fn test_zip64_header() {
        let big = 5_000_000_000u64;
        let lfh = LocalFileHeader::new(b"big", CompressionMethod::Stored, 1, big, big);
        assert!(lfh.is_zip64());
        assert_eq!(lfh.size(), 30 + 3 + 20);

        let bytes = lfh.encode();
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), VERSION_ZIP64);
        assert_eq!(&bytes[18..26], &[0xFF; 8]);
        assert_eq!(u16::from_le_bytes([bytes[28], bytes[29]]), 20);
        assert_eq!(u16::from_le_bytes([bytes[33], bytes[34]]), EXTRA_ID);

        let decoded = LocalFileHeader::decode(&bytes).unwrap();
        assert_eq!(decoded, lfh);
    }

    #[test]
    fn test_padding() {
        let mut lfh = LocalFileHeader::new(b"lib.so", CompressionMethod::Stored, 0, 10, 10);
        lfh.set_padding(100).unwrap();
        assert_eq!(lfh.size(), 36);
        assert_eq!(lfh.encoded_size(), 136);

        let bytes = lfh.encode();
        assert_eq!(bytes.len(), 136);
        assert_eq!(u16::from_le_bytes([bytes[28], bytes[29]]), 100);
        assert!(bytes[36..].iter().all(|&b| b == 0));

        let decoded = LocalFileHeader::decode(&bytes).unwrap();
        assert_eq!(decoded.padding(), 100);
        assert_eq!(decoded.name(), b"lib.so");
    }

    #[test]
    fn test_padding_overflow() {
        let mut lfh = LocalFileHeader::new(b"x", CompressionMethod::Stored, 0, 0, 0);
        assert!(lfh.set_padding(65535).is_ok());
        assert!(lfh.set_padding(65536).unwrap_err().is_illegal_state());

        let big = 1u64 << 33;
        let mut lfh = LocalFileHeader::new(b"x", CompressionMethod::Stored, 0, big, big);
        assert!(lfh.set_padding(65535 - 20).is_ok());
        assert!(lfh.set_padding(65535 - 19).is_err());
    }

    #[test]
    fn test_sentinel_size_switches_to_zip64() {
        let lfh = LocalFileHeader::new(b"x", CompressionMethod::Stored, 0, 0xFFFF_FFFF, 0xFFFF_FFFF);
        assert!(lfh.is_zip64());
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let err = LocalFileHeader::decode(&[0x50, 0x4b, 0x01, 0x02, 0, 0]).unwrap_err();
        assert!(err.is_corruption());
        let lfh = LocalFileHeader::new(b"abc", CompressionMethod::Stored, 0, 0, 0).encode();
        let err = LocalFileHeader::decode(&lfh[..31]).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_virtual_entry() {
        let entry = encode_virtual_entry(30).unwrap();
        assert_eq!(entry.len(), 30);
        let lfh = LocalFileHeader::decode(&entry).unwrap();
        assert!(lfh.name().is_empty());
        assert_eq!(lfh.padding(), 0);
        assert_eq!(lfh.compressed_size(), 0);

        let entry = encode_virtual_entry(LocalFileHeader::VIRTUAL_ENTRY_MAX_SIZE).unwrap();
        assert_eq!(u16::from_le_bytes([entry[28], entry[29]]), u16::MAX);
        assert!(encode_virtual_entry(LocalFileHeader::VIRTUAL_ENTRY_MAX_SIZE + 1).is_err());
        assert!(encode_virtual_entry(0).unwrap_err().is_illegal_state());
    }
}
