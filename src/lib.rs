//! # zipsplice
//!
//! In-place editing of ZIP archives.
//!
//! Adding or deleting an entry does not rewrite the archive. New entries go
//! into space freed by deleted ones, or after the last entry, and on close
//! only the Central Directory and the footers are written again. Entries
//! that are not touched are never read, moved, or recompressed, which keeps
//! incremental packaging of large archives (APKs, JARs) fast.
//!
//! ## Quick Start
//!
//! ### Editing an Archive
//!
//! ```rust,no_run
//! use zipsplice::{ByteSource, Result, ZipArchive};
//!
//! fn main() -> Result<()> {
//!     // Opens the file, or starts a new archive if it does not exist
//!     let mut archive = ZipArchive::open("app.zip")?;
//!
//!     // Deleting frees the entry's space for later additions
//!     archive.delete("old.txt")?;
//!
//!     // Level 0 stores, 1-9 deflate
//!     archive.add(ByteSource::new(b"Hello, World!".to_vec(), "hello.txt", 6)?)?;
//!
//!     let info = archive.close()?;
//!     println!("Central Directory at {}", info.cd);
//!     Ok(())
//! }
//! ```
//!
//! ### Reading
//!
//! ```rust,no_run
//! use zipsplice::{Result, ZipArchive};
//!
//! fn main() -> Result<()> {
//!     for (name, entry) in ZipArchive::list_entries_in("app.zip")? {
//!         println!("{}: {} bytes", name, entry.size);
//!     }
//!
//!     let mut archive = ZipArchive::open("app.zip")?;
//!     if let Some(bytes) = archive.get_content("hello.txt")? {
//!         println!("{}", String::from_utf8_lossy(&bytes));
//!     }
//!     // Closing an unmodified archive leaves the file untouched
//!     archive.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ### Copying Between Archives
//!
//! ```rust,no_run
//! use zipsplice::{Result, ZipArchive, ZipSource, PAGE_ALIGNMENT};
//!
//! fn main() -> Result<()> {
//!     let mut libs = ZipSource::open("native.zip")?;
//!     // Stored and page aligned so it can be mapped directly
//!     libs.select_with_level("libfoo.so", "lib/arm64-v8a/libfoo.so", 0)?
//!         .align(PAGE_ALIGNMENT)?;
//!
//!     let mut apk = ZipArchive::open("app.apk")?;
//!     apk.add_zip_source(libs)?;
//!     apk.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Reproducible Output
//!
//! The layout depends only on the sequence of operations. Wrap the archive in
//! [`edit::OrderedArchive`] to make it independent of call order as well, and
//! in [`edit::SynchronizedArchive`] to feed it from several threads.
//!
//! ## Zip64
//!
//! Zip64 structures are read and written automatically when an entry, an
//! offset, or the entry count exceeds the classic limits. Producers that
//! must stay within them use [`Zip64Policy::Forbid`]:
//!
//! ```rust,no_run
//! use zipsplice::{ArchiveOptions, Zip64Policy, ZipArchive};
//!
//! let options = ArchiveOptions::new().zip64_policy(Zip64Policy::Forbid);
//! let mut archive = ZipArchive::open_with_options("legacy.zip", options)?;
//! // Fails instead of writing a Zip64 footer
//! archive.close()?;
//! # Ok::<(), zipsplice::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`]. [`Error`] distinguishes malformed
//! archives, Zip64 policy violations, API misuse, and I/O failures:
//!
//! ```rust,no_run
//! use zipsplice::{Error, ZipArchive};
//!
//! match ZipArchive::open("maybe.zip") {
//!     Ok(archive) => println!("{} entries", archive.list_entries().len()),
//!     Err(e) if e.is_corruption() => eprintln!("Not a usable ZIP file: {}", e),
//!     Err(Error::Io(e)) => eprintln!("I/O error: {}", e),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```
//!
//! ## Limitations
//!
//! Split archives, encryption, and archive comments are not supported. Input
//! and output must be seekable files.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod checksum;
pub mod codec;
pub mod edit;
pub mod error;
pub mod format;
pub mod fs;
pub mod read;
pub mod write;

pub use codec::CompressionMethod;
pub use error::{Error, Result};
pub use format::{Location, Zip64Policy};
pub use read::{Entry, ZipMap};
pub use write::{
    Archive, ArchiveOptions, ByteSource, FreeStore, PAGE_ALIGNMENT, Source, ZipArchive, ZipInfo,
    ZipSource,
};
