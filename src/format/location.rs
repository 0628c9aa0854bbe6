//! Byte ranges inside an archive file.

use std::fmt;

/// A half-open byte range `[first, first + size)`.
///
/// Locations order by `first`, then by `size`. [`Location::INVALID`] marks
/// a range that is unknown or absent.
///
/// ```rust
/// use zipsplice::Location;
///
/// let loc = Location::new(10, 5);
/// assert_eq!(loc.end(), 15);
/// assert!(loc.contains(14));
/// assert!(!loc.contains(15));
/// assert!(!Location::INVALID.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    first: u64,
    size: u64,
}

impl Location {
    /// Sentinel for an absent range.
    pub const INVALID: Location = Location {
        first: u64::MAX,
        size: 0,
    };

    /// Creates a range starting at `first` spanning `size` bytes.
    pub const fn new(first: u64, size: u64) -> Self {
        Self { first, size }
    }

    /// Creates the range `[first, end)`.
    pub fn from_bounds(first: u64, end: u64) -> Self {
        Self::new(first, end.saturating_sub(first))
    }

    /// Offset of the first byte.
    pub fn first(&self) -> u64 {
        self.first
    }

    /// Number of bytes covered.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Offset one past the last byte.
    pub fn end(&self) -> u64 {
        self.first.saturating_add(self.size)
    }

    /// Returns `false` for [`Location::INVALID`].
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Returns `true` if `offset` falls inside the range.
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.first && offset < self.end()
    }

    /// Returns `true` if both ranges share at least one byte.
    ///
    /// An empty range overlaps nothing.
    pub fn overlaps(&self, other: &Location) -> bool {
        self.size > 0
            && other.size > 0
            && self.first < other.end()
            && other.first < self.end()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "[{:#x}, {:#x})", self.first, self.end())
        } else {
            write!(f, "[invalid]")
        }
    }
}
