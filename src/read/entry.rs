//! Parsed archive entries.

use crate::codec::CompressionMethod;
use crate::format::Location;

/// An entry already present in a ZIP archive.
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields
/// in future versions without breaking downstream code. Pattern matching
/// on `Entry` requires a `..` wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Entry {
    /// Entry name as stored (UTF-8, `/` separated).
    pub name: String,
    /// CRC-32 of the uncompressed bytes.
    pub crc32: u32,
    /// Payload size as stored.
    pub compressed_size: u64,
    /// Size once decompressed.
    pub size: u64,
    /// How the payload is stored.
    pub compression: CompressionMethod,
    /// Whether the Central Directory record carried a Zip64 extra field.
    pub is_zip64: bool,
    pub(crate) location: Location,
    pub(crate) payload_location: Location,
    pub(crate) cd_location: Location,
}

impl Entry {
    /// Returns `true` if the name ends with `/`.
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Returns `true` unless the payload is stored.
    pub fn is_compressed(&self) -> bool {
        self.compression.is_compressed()
    }

    /// Byte range of the local header, payload, and data descriptor.
    ///
    /// [`Location::INVALID`] when the archive was parsed without data
    /// descriptor accounting and this entry has one, since its end is then
    /// unknown.
    pub fn location(&self) -> Location {
        self.location
    }

    /// Byte range of the payload alone.
    pub fn payload_location(&self) -> Location {
        self.payload_location
    }

    /// Byte range of the Central Directory record, relative to the start of
    /// the Central Directory.
    pub fn cd_location(&self) -> Location {
        self.cd_location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, compression: CompressionMethod) -> Entry {
        Entry {
            name: name.into(),
            crc32: 0,
            compressed_size: 0,
            size: 0,
            compression,
            is_zip64: false,
            location: Location::new(0, 30),
            payload_location: Location::new(30, 0),
            cd_location: Location::new(0, 46),
        }
    }

    #[test]
    fn test_is_directory() {
        assert!(entry("res/", CompressionMethod::Stored).is_directory());
        assert!(!entry("res/a.xml", CompressionMethod::Stored).is_directory());
        assert!(!entry("", CompressionMethod::Stored).is_directory());
    }

    #[test]
    fn test_is_compressed() {
        assert!(!entry("a", CompressionMethod::Stored).is_compressed());
        assert!(entry("a", CompressionMethod::Deflate).is_compressed());
    }
}
