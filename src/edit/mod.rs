//! Wrappers around an [`Archive`](crate::Archive).
//!
//! - [`OrderedArchive`] buffers operations and replays them in a canonical
//!   order on close, so the output does not depend on call order.
//! - [`SynchronizedArchive`] puts one lock around every operation so
//!   several threads can feed the same archive.
//!
//! Both wrap any `Archive`, so they compose:
//!
//! ```rust,no_run
//! use zipsplice::edit::{OrderedArchive, SynchronizedArchive};
//! use zipsplice::{ByteSource, ZipArchive};
//!
//! let archive = SynchronizedArchive::new(OrderedArchive::new(ZipArchive::open("out.zip")?));
//! archive.add(ByteSource::new(b"data".to_vec(), "data.bin", 0)?)?;
//! archive.close()?;
//! # Ok::<(), zipsplice::Error>(())
//! ```

mod operation;
mod ordered;
mod synchronized;

pub use operation::Operation;
pub use ordered::OrderedArchive;
pub use synchronized::SynchronizedArchive;
