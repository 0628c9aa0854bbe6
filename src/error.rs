//! Error types for ZIP archive operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when parsing or mutating ZIP archives, along with a
//! convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`. Errors
//! fall into four families:
//!
//! | Family | Variants | Meaning |
//! |--------|----------|---------|
//! | Format | [`InvalidFormat`][Error::InvalidFormat], [`CorruptHeader`][Error::CorruptHeader] | The on-disk structure is malformed |
//! | Policy | [`Zip64Forbidden`][Error::Zip64Forbidden] | Zip64 is required but the archive forbids it |
//! | Illegal state | [`ArchiveClosed`][Error::ArchiveClosed], [`EntryExists`][Error::EntryExists], ... | The operation was misused |
//! | I/O | [`Io`][Error::Io] | The storage layer failed |
//!
//! None of them are retried internally.
//!
//! ```rust,no_run
//! use zipsplice::{Error, ZipArchive};
//!
//! fn open(path: &str) -> zipsplice::Result<ZipArchive> {
//!     match ZipArchive::open(path) {
//!         Err(Error::InvalidFormat(msg)) => {
//!             eprintln!("Not a ZIP archive: {}", msg);
//!             Err(Error::InvalidFormat(msg))
//!         }
//!         other => other,
//!     }
//! }
//! ```

use std::io;

/// The error type for ZIP archive operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while reading or writing the archive file.
    ///
    /// Partially written bytes may remain on disk when this happens during
    /// [`ZipArchive::close`](crate::ZipArchive::close).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not a ZIP archive or one of its structures is unusable.
    ///
    /// Returned when the End of Central Directory cannot be found, when a
    /// Zip64 locator points at garbage, or when an entry lies outside the
    /// file.
    #[error("Invalid ZIP format: {0}")]
    InvalidFormat(String),

    /// A header at a known offset is truncated or inconsistent.
    #[error("Corrupt header at offset {offset:#x}: {reason}")]
    CorruptHeader {
        /// The byte offset where corruption was detected.
        offset: u64,
        /// A description of the corruption.
        reason: String,
    },

    /// The entry uses a compression method this crate cannot decode.
    #[error("Unsupported compression method: {method}")]
    UnsupportedMethod {
        /// The ZIP compression method number.
        method: u16,
    },

    /// Zip64 structures are required but the archive policy forbids them.
    ///
    /// Raised while parsing an existing Zip64 archive, while adding an entry
    /// that exceeds the 32-bit limits, or while laying out the footer on
    /// close.
    #[error("Zip64 required but forbidden: {reason}")]
    Zip64Forbidden {
        /// What required Zip64.
        reason: String,
    },

    /// An operation was attempted on a closed archive.
    #[error("Archive is closed: {path}")]
    ArchiveClosed {
        /// Path of the archive file.
        path: String,
    },

    /// An entry with the same name is already present or pending.
    ///
    /// Delete the existing entry first when replacing it.
    #[error("Entry already exists: {name}")]
    EntryExists {
        /// The colliding entry name.
        name: String,
    },

    /// A selected entry does not exist in the source archive.
    #[error("Entry not found: {name}")]
    EntryNotFound {
        /// The missing entry name.
        name: String,
    },

    /// An entry name does not fit the 16-bit name length field.
    #[error("Entry name is {length} bytes, more than 65535: {name}")]
    NameTooLong {
        /// The offending name.
        name: String,
        /// Its UTF-8 length in bytes.
        length: usize,
    },

    /// An invalid compression level was provided.
    ///
    /// Levels follow DEFLATE conventions: 0 stores, 1-9 compress.
    ///
    /// ```rust
    /// use zipsplice::{ByteSource, Error};
    ///
    /// let result = ByteSource::new(b"data".to_vec(), "a.txt", 15);
    /// assert!(matches!(result, Err(Error::InvalidCompressionLevel { level: 15 })));
    /// ```
    #[error("invalid compression level {level}: must be 0-9")]
    InvalidCompressionLevel {
        /// The invalid level that was provided.
        level: u32,
    },

    /// An alignment request of zero or above the supported maximum.
    #[error("invalid alignment {alignment}: must be 1-32768")]
    InvalidAlignment {
        /// The rejected alignment.
        alignment: u64,
    },

    /// Any other misuse of the archive state.
    #[error("Illegal state: {0}")]
    IllegalState(String),
}

impl Error {
    /// Returns `true` if this error indicates a malformed archive.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::InvalidFormat(_) | Error::CorruptHeader { .. })
    }

    /// Returns `true` if this error is a Zip64 policy violation.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Error::Zip64Forbidden { .. })
    }

    /// Returns `true` if this error reports misuse of the API rather than a
    /// problem with the archive or the storage.
    pub fn is_illegal_state(&self) -> bool {
        matches!(
            self,
            Error::ArchiveClosed { .. }
                | Error::EntryExists { .. }
                | Error::EntryNotFound { .. }
                | Error::NameTooLong { .. }
                | Error::InvalidCompressionLevel { .. }
                | Error::InvalidAlignment { .. }
                | Error::IllegalState(_)
        )
    }

    /// Returns the entry name associated with this error, if any.
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Error::EntryExists { name }
            | Error::EntryNotFound { name }
            | Error::NameTooLong { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Creates a CorruptHeader error.
    pub fn corrupt_header(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptHeader {
            offset,
            reason: reason.into(),
        }
    }

    /// Creates a Zip64Forbidden error.
    pub fn zip64_forbidden(reason: impl Into<String>) -> Self {
        Error::Zip64Forbidden {
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for ZIP operations.
pub type Result<T> = std::result::Result<T, Error>;
