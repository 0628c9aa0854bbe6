//! ZIP record layouts, constants, and low-level codecs.
//!
//! Every integer in a ZIP file is little-endian. The records handled here
//! are the ones an in-place editor has to read or produce:
//!
//! | Record | Module | Fixed size |
//! |--------|--------|------------|
//! | Local File Header | [`local`] | 30 bytes + name + extra |
//! | Central Directory record | [`central`] | 46 bytes + name + extra + comment |
//! | End of Central Directory | [`eocd`] | 22 bytes |
//! | Zip64 End of Central Directory | [`zip64`] | 56 bytes |
//! | Zip64 locator | [`zip64`] | 20 bytes |

pub mod central;
pub mod eocd;
pub mod local;
pub mod location;
pub mod reader;
pub mod zip64;

pub use central::CentralDirectoryRecord;
pub use eocd::EndOfCentralDirectory;
pub use local::LocalFileHeader;
pub use location::Location;
pub use zip64::{Zip64Eocd, Zip64Locator, Zip64Policy};

/// Largest value of a 16-bit field (entry count, name and extra lengths).
pub const U16_MAX: u64 = u16::MAX as u64;

/// Largest value of a 32-bit field (sizes and offsets).
pub const U32_MAX: u64 = u32::MAX as u64;

/// Version needed to extract a stored or deflated entry (2.0).
pub const VERSION_DEFAULT: u16 = 20;

/// Version needed to extract an entry using Zip64 fields (4.5).
pub const VERSION_ZIP64: u16 = 45;

/// MS-DOS time written to every new header (00:00:00).
pub const DEFAULT_TIME: u16 = 0;

/// MS-DOS date written to every new header (1981-01-01).
///
/// A fixed timestamp keeps output byte-identical across runs.
pub const DEFAULT_DATE: u16 = (1 << 9) | (1 << 5) | 1;

/// General-purpose flag bit announcing a trailing data descriptor.
pub const DATA_DESCRIPTOR_FLAG: u16 = 0x0008;

/// Optional signature at the start of a data descriptor.
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

/// Data descriptor size without signature (CRC + two 32-bit sizes).
pub const DATA_DESCRIPTOR_SIZE: u64 = 12;

/// Data descriptor size without signature for Zip64 entries (two 64-bit sizes).
pub const DATA_DESCRIPTOR_ZIP64_SIZE: u64 = 20;
