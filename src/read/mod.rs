//! Archive parsing.
//!
//! [`ZipMap`] locates every entry of an existing archive from its Central
//! Directory and Local File Headers without reading any payload.
//!
//! # Example
//!
//! ```rust,no_run
//! use zipsplice::read::ZipMap;
//! use zipsplice::Zip64Policy;
//!
//! let map = ZipMap::from_path("archive.zip", true, Zip64Policy::Allow)?;
//! for entry in map.entries().values() {
//!     println!("{}: {} bytes ({})", entry.name, entry.size, entry.compression);
//! }
//! # Ok::<(), zipsplice::Error>(())
//! ```

mod entry;
mod map;

pub use entry::Entry;
pub use map::ZipMap;
