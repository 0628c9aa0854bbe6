//! Raw DEFLATE (RFC 1951) without zlib or gzip framing, as stored in ZIP
//! entries with method 8.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::bufread::DeflateDecoder as FlateDecoder;
use flate2::write::DeflateEncoder as FlateEncoder;

/// Compresses `data` at `level` (clamped to 0-9).
pub fn deflate_raw(data: &[u8], level: u32) -> io::Result<Vec<u8>> {
    let mut encoder = FlateEncoder::new(
        Vec::with_capacity(data.len() / 2 + 64),
        Compression::new(level.min(9)),
    );
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompresses a raw DEFLATE stream.
pub fn inflate_raw(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = FlateDecoder::new(data);
    let mut out = Vec::with_capacity(data.len().saturating_mul(2));
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflate_roundtrip() {
        let data = b"Hello, World! This is a test of Deflate compression.";
        let compressed = deflate_raw(data, 6).unwrap();
        assert_eq!(inflate_raw(&compressed).unwrap(), data);
    }

    #[test]
    fn test_deflate_is_raw() {
        // A zlib stream would start with 0x78.
        let compressed = deflate_raw(&[0u8; 1024], 9).unwrap();
        assert_ne!(compressed[0], 0x78);
        assert!(compressed.len() < 1024);
    }

    #[test]
    fn test_deflate_empty() {
        let compressed = deflate_raw(&[], 6).unwrap();
        assert!(!compressed.is_empty());
        assert!(inflate_raw(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_level_clamped() {
        let data = vec![7u8; 4096];
        assert_eq!(deflate_raw(&data, 100).unwrap(), deflate_raw(&data, 9).unwrap());
    }

    #[test]
    fn test_inflate_garbage() {
        assert!(inflate_raw(&[0xFF, 0xFF, 0xFF, 0xFF]).is_err());
    }
}
