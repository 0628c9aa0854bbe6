//! Buffered archive operations.

use crate::write::{ByteSource, ZipSource};

/// A pending modification of an archive.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Delete an entry.
    Delete {
        /// Name to delete.
        name: String,
    },
    /// Add an entry built from bytes.
    Add {
        /// The new entry.
        source: ByteSource,
    },
    /// Add entries selected from another archive.
    AddZip {
        /// The selection.
        source: ZipSource,
    },
}

impl Operation {
    /// Returns the operation type as a string.
    pub fn operation_type(&self) -> &'static str {
        match self {
            Operation::Delete { .. } => "delete",
            Operation::Add { .. } => "add",
            Operation::AddZip { .. } => "add zip",
        }
    }

    /// Replay rank: deletions first, then byte sources, then zip sources.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Operation::Delete { .. } => 0,
            Operation::Add { .. } => 1,
            Operation::AddZip { .. } => 2,
        }
    }
}
