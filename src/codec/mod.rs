//! Compression support for ZIP entries.
//!
//! Only the two methods every ZIP reader understands are produced: stored
//! (method 0) and raw DEFLATE (method 8). Entries using any other method can
//! still be listed, deleted and transferred byte-for-byte between archives,
//! but their content cannot be extracted or recompressed.

pub mod deflate;

pub use deflate::{deflate_raw, inflate_raw};

use crate::{Error, Result};

/// Compression level that stores bytes unchanged.
pub const NO_COMPRESSION: u32 = 0;

/// Compression level used when none is specified.
pub const DEFAULT_LEVEL: u32 = 6;

/// Highest DEFLATE compression level.
pub const BEST_COMPRESSION: u32 = 9;

/// Checks that `level` is a valid DEFLATE level.
pub fn validate_level(level: u32) -> Result<u32> {
    if level > BEST_COMPRESSION {
        return Err(Error::InvalidCompressionLevel { level });
    }
    Ok(level)
}

/// ZIP compression method of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    /// Method 0: payload holds the bytes unchanged.
    Stored,
    /// Method 8: payload holds raw DEFLATE data.
    Deflate,
    /// Any other method number.
    Other(u16),
}

impl CompressionMethod {
    /// Maps a method number from a ZIP header.
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            other => CompressionMethod::Other(other),
        }
    }

    /// Returns the method number written to ZIP headers.
    pub fn as_u16(self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Other(value) => value,
        }
    }

    /// Returns `true` unless the payload is stored.
    pub fn is_compressed(self) -> bool {
        self != CompressionMethod::Stored
    }

    /// Method produced by compressing at `level`.
    pub fn for_level(level: u32) -> Self {
        if level == NO_COMPRESSION {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflate
        }
    }

    /// Decodes a payload stored with this method.
    pub fn decode(self, payload: Vec<u8>) -> Result<Vec<u8>> {
        match self {
            CompressionMethod::Stored => Ok(payload),
            CompressionMethod::Deflate => Ok(inflate_raw(&payload)?),
            CompressionMethod::Other(method) => Err(Error::UnsupportedMethod { method }),
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionMethod::Stored => write!(f, "stored"),
            CompressionMethod::Deflate => write!(f, "deflate"),
            CompressionMethod::Other(method) => write!(f, "method {}", method),
        }
    }
}
