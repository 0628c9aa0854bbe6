//! Entry data waiting to be written.
//!
//! A [`Source`] carries a name, the payload (or where to find it in another
//! archive) and the sizing needed by the headers. Sources built from bytes
//! are compressed when constructed; sources copied from another archive
//! either transfer their payload verbatim or are inflated/deflated by
//! [`Source::prepare`] before the archive allocates room for them.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::checksum::Crc32;
use crate::codec::{self, CompressionMethod, deflate_raw};
use crate::format::Location;
use crate::fs::ZipWriter;
use crate::read::Entry;
use crate::{Error, Result};

/// Alignment for payloads that are mapped directly from the archive, such as
/// uncompressed native libraries.
pub const PAGE_ALIGNMENT: u64 = 4096;

/// Largest accepted alignment. The padding it may need always fits the
/// 16-bit extra field, even next to a Zip64 extra.
pub const MAX_ALIGNMENT: u64 = 32768;

/// Header values of a prepared source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Sizing {
    pub crc: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub method: CompressionMethod,
}

#[derive(Debug, Clone)]
enum SourceKind {
    /// Payload bytes held in memory, already in their final encoding.
    Bytes { payload: Vec<u8> },
    /// Payload copied verbatim from another archive.
    Transfer { payload_location: Location },
    /// Payload inflated from another archive and stored.
    Inflate {
        payload_location: Location,
        method: CompressionMethod,
    },
    /// Stored payload from another archive, deflated at `level`.
    Deflate {
        payload_location: Location,
        level: u32,
    },
}

/// An entry to be written to an archive.
#[derive(Debug, Clone)]
pub struct Source {
    name: String,
    alignment: u64,
    kind: SourceKind,
    sizing: Sizing,
}

impl Source {
    fn from_bytes(name: String, bytes: Vec<u8>, level: u32) -> Result<Self> {
        let level = codec::validate_level(level)?;
        let crc = Crc32::compute(&bytes);
        let uncompressed_size = bytes.len() as u64;
        let method = CompressionMethod::for_level(level);
        let payload = match method {
            CompressionMethod::Stored => bytes,
            _ => deflate_raw(&bytes, level)?,
        };
        Ok(Self {
            name,
            alignment: 1,
            sizing: Sizing {
                crc,
                compressed_size: payload.len() as u64,
                uncompressed_size,
                method,
            },
            kind: SourceKind::Bytes { payload },
        })
    }

    /// Source copying `entry` out of another archive.
    ///
    /// `level` of `None` keeps the payload as is. `Some(0)` stores it and
    /// `Some(1..=9)` deflates it; both are zero-copy when the entry already
    /// has the requested state.
    pub(crate) fn from_entry(name: String, entry: &Entry, level: Option<u32>) -> Result<Self> {
        let level = level.map(codec::validate_level).transpose()?;
        let payload_location = entry.payload_location();
        let kind = match level {
            None => SourceKind::Transfer { payload_location },
            Some(codec::NO_COMPRESSION) if !entry.is_compressed() => {
                SourceKind::Transfer { payload_location }
            }
            Some(level) if level != codec::NO_COMPRESSION && entry.is_compressed() => {
                SourceKind::Transfer { payload_location }
            }
            Some(codec::NO_COMPRESSION) => SourceKind::Inflate {
                payload_location,
                method: entry.compression,
            },
            Some(level) => SourceKind::Deflate {
                payload_location,
                level,
            },
        };
        Ok(Self {
            name,
            alignment: 1,
            kind,
            sizing: Sizing {
                crc: entry.crc32,
                compressed_size: entry.compressed_size,
                uncompressed_size: entry.size,
                method: entry.compression,
            },
        })
    }

    /// Entry name in the destination archive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested payload alignment; 1 means none.
    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    /// Returns `true` if the payload start must be aligned.
    pub fn is_aligned(&self) -> bool {
        self.alignment > 1
    }

    /// Requires the payload to start at a multiple of `alignment`.
    ///
    /// ```rust
    /// use zipsplice::{ByteSource, PAGE_ALIGNMENT};
    ///
    /// let source = ByteSource::new(vec![0x7f; 64], "lib/arm64-v8a/libfoo.so", 0)?
    ///     .align(PAGE_ALIGNMENT)?;
    /// assert_eq!(source.alignment(), 4096);
    /// # Ok::<(), zipsplice::Error>(())
    /// ```
    pub fn align(&mut self, alignment: u64) -> Result<&mut Self> {
        if alignment == 0 || alignment > MAX_ALIGNMENT {
            return Err(Error::InvalidAlignment { alignment });
        }
        self.alignment = alignment;
        Ok(self)
    }

    /// Returns `true` once the sizing no longer depends on reading the
    /// origin archive.
    pub(crate) fn is_prepared(&self) -> bool {
        matches!(
            self.kind,
            SourceKind::Bytes { .. } | SourceKind::Transfer { .. }
        )
    }

    /// Resolves recompression so that the sizing is final.
    ///
    /// `origin` is the archive the entry comes from; sources built from
    /// bytes ignore it.
    pub(crate) fn prepare(&mut self, origin: Option<&mut File>) -> Result<()> {
        if self.is_prepared() {
            return Ok(());
        }
        let origin = origin.ok_or_else(|| {
            Error::IllegalState(format!("'{}' needs its source archive open", self.name))
        })?;
        let (payload, method) = match self.kind {
            SourceKind::Inflate {
                payload_location,
                method,
            } => {
                let raw = read_location(origin, payload_location)?;
                (method.decode(raw)?, CompressionMethod::Stored)
            }
            SourceKind::Deflate {
                payload_location,
                level,
            } => {
                let raw = read_location(origin, payload_location)?;
                (deflate_raw(&raw, level)?, CompressionMethod::Deflate)
            }
            SourceKind::Bytes { .. } | SourceKind::Transfer { .. } => return Ok(()),
        };
        log::trace!(
            "recompressed '{}' as {}: {} -> {} bytes",
            self.name,
            method,
            self.sizing.compressed_size,
            payload.len()
        );
        self.sizing.compressed_size = payload.len() as u64;
        self.sizing.method = method;
        self.kind = SourceKind::Bytes { payload };
        Ok(())
    }

    pub(crate) fn sizing(&self) -> Sizing {
        self.sizing
    }

    /// Writes the payload at the writer's current position.
    pub(crate) fn write_payload(
        &self,
        writer: &mut ZipWriter,
        origin: Option<&mut File>,
    ) -> Result<u64> {
        use std::io::Write;

        match &self.kind {
            SourceKind::Bytes { payload } => {
                writer.write_all(payload)?;
                Ok(payload.len() as u64)
            }
            SourceKind::Transfer { payload_location } => {
                let origin = origin.ok_or_else(|| {
                    Error::IllegalState(format!("'{}' needs its source archive open", self.name))
                })?;
                writer.transfer_from(origin, payload_location.first(), payload_location.size())?;
                Ok(payload_location.size())
            }
            SourceKind::Inflate { .. } | SourceKind::Deflate { .. } => Err(Error::IllegalState(
                format!("'{}' was not prepared", self.name),
            )),
        }
    }
}

fn read_location(file: &mut File, location: Location) -> Result<Vec<u8>> {
    let len = usize::try_from(location.size())
        .map_err(|_| Error::IllegalState(format!("payload {} does not fit in memory", location)))?;
    file.seek(SeekFrom::Start(location.first()))?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

/// An entry built from bytes in memory.
///
/// # Example
///
/// ```rust,no_run
/// use zipsplice::{ByteSource, ZipArchive};
///
/// let mut archive = ZipArchive::open("app.zip")?;
/// archive.add(ByteSource::new(b"hello".to_vec(), "greeting.txt", 6)?)?;
/// archive.add(ByteSource::directory("assets"))?;
/// archive.close()?;
/// # Ok::<(), zipsplice::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ByteSource {
    source: Source,
}

impl ByteSource {
    /// Compresses `bytes` at `level` (0 stores, 1-9 deflate).
    pub fn new(bytes: Vec<u8>, name: impl Into<String>, level: u32) -> Result<Self> {
        Ok(Self {
            source: Source::from_bytes(name.into(), bytes, level)?,
        })
    }

    /// Reads the whole file at `path`.
    pub fn from_path(path: impl AsRef<Path>, name: impl Into<String>, level: u32) -> Result<Self> {
        codec::validate_level(level)?;
        let bytes = std::fs::read(path)?;
        Self::new(bytes, name, level)
    }

    /// Drains `reader`.
    pub fn from_reader<R: Read>(mut reader: R, name: impl Into<String>, level: u32) -> Result<Self> {
        codec::validate_level(level)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::new(bytes, name, level)
    }

    /// An empty stored entry named `name/`.
    pub fn directory(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if !name.ends_with('/') {
            name.push('/');
        }
        Self {
            source: Source {
                name,
                alignment: 1,
                kind: SourceKind::Bytes {
                    payload: Vec::new(),
                },
                sizing: Sizing {
                    crc: 0,
                    compressed_size: 0,
                    uncompressed_size: 0,
                    method: CompressionMethod::Stored,
                },
            },
        }
    }

    /// Requires the payload to start at a multiple of `alignment`.
    pub fn align(mut self, alignment: u64) -> Result<Self> {
        self.source.align(alignment)?;
        Ok(self)
    }

    /// Entry name.
    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Requested payload alignment; 1 means none.
    pub fn alignment(&self) -> u64 {
        self.source.alignment()
    }

    /// CRC-32 of the uncompressed bytes.
    pub fn crc32(&self) -> u32 {
        self.source.sizing.crc
    }

    /// Size of the payload as written.
    pub fn compressed_size(&self) -> u64 {
        self.source.sizing.compressed_size
    }

    /// Size of the bytes before compression.
    pub fn size(&self) -> u64 {
        self.source.sizing.uncompressed_size
    }

    /// How the payload is encoded.
    pub fn compression(&self) -> CompressionMethod {
        self.source.sizing.method
    }

    pub(crate) fn into_source(self) -> Source {
        self.source
    }
}
