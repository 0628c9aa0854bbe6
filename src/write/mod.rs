//! In-place archive editing.
//!
//! [`ZipArchive`] is the engine. It is built from a few parts:
//!
//! - a [`FreeStore`] tracking which byte ranges of the file are unused,
//! - a Central Directory overlay that keeps the original records as read
//!   and appends records for added entries,
//! - [`ByteSource`] and [`ZipSource`], describing what to add.
//!
//! The [`Archive`] trait is the surface shared by the engine and the
//! wrappers in [`crate::edit`].
//!
//! # Example
//!
//! ```rust,no_run
//! use zipsplice::{Archive, ByteSource, ZipArchive};
//!
//! fn replace(archive: &mut impl Archive, name: &str, data: &[u8]) -> zipsplice::Result<()> {
//!     archive.delete(name)?;
//!     archive.add(ByteSource::new(data.to_vec(), name, 6)?)
//! }
//!
//! let mut archive = ZipArchive::open("app.zip")?;
//! replace(&mut archive, "res/values.xml", b"<resources/>")?;
//! archive.close()?;
//! # Ok::<(), zipsplice::Error>(())
//! ```

mod archive;
mod central_directory;
mod free_store;
pub(crate) mod options;
mod source;
mod zip_source;

pub use archive::{ZipArchive, ZipInfo};
pub use free_store::FreeStore;
pub use options::ArchiveOptions;
pub use source::{ByteSource, MAX_ALIGNMENT, PAGE_ALIGNMENT, Source};
pub use zip_source::ZipSource;

use crate::Result;

/// Operations shared by [`ZipArchive`] and its wrappers.
pub trait Archive {
    /// Adds an entry built from bytes.
    fn add(&mut self, source: ByteSource) -> Result<()>;

    /// Adds the entries selected from another archive.
    fn add_zip_source(&mut self, source: ZipSource) -> Result<()>;

    /// Removes an entry; a missing name is not an error.
    fn delete(&mut self, name: &str) -> Result<()>;

    /// Finalizes the archive. Any later call fails.
    fn close(&mut self) -> Result<ZipInfo>;

    /// Returns `true` once the archive has been closed.
    fn is_closed(&self) -> bool;
}

impl Archive for ZipArchive {
    fn add(&mut self, source: ByteSource) -> Result<()> {
        ZipArchive::add(self, source)
    }

    fn add_zip_source(&mut self, source: ZipSource) -> Result<()> {
        ZipArchive::add_zip_source(self, source)
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        ZipArchive::delete(self, name)
    }

    fn close(&mut self) -> Result<ZipInfo> {
        ZipArchive::close(self)
    }

    fn is_closed(&self) -> bool {
        ZipArchive::is_closed(self)
    }
}

impl<A: Archive + ?Sized> Archive for Box<A> {
    fn add(&mut self, source: ByteSource) -> Result<()> {
        (**self).add(source)
    }

    fn add_zip_source(&mut self, source: ZipSource) -> Result<()> {
        (**self).add_zip_source(source)
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        (**self).delete(name)
    }

    fn close(&mut self) -> Result<ZipInfo> {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}
