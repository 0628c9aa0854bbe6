//! Free-space tracking inside an archive file.
//!
//! The store holds every byte range not claimed by an entry record, sorted
//! and coalesced, and always ends with an unbounded range starting where
//! the last record ends. New records are placed first-fit; deleted records
//! are handed back and merged with their neighbours.
//!
//! Placement depends only on the sequence of allocations and frees, never
//! on timing or hashing, so the same operations always yield the same
//! layout.

use std::collections::BTreeMap;

use crate::format::{LocalFileHeader, Location};

/// Smallest bounded free range a filler entry can cover.
const MIN_HOLE: u64 = LocalFileHeader::SIZE;

/// Sorted, coalesced set of free byte ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeStore {
    /// Start offset to exclusive end. The last range ends at `u64::MAX`.
    free: BTreeMap<u64, u64>,
}

impl Default for FreeStore {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}

impl FreeStore {
    /// Builds the complement of `used` within `[0, u64::MAX)`.
    ///
    /// Invalid locations are ignored.
    pub fn new(used: impl IntoIterator<Item = Location>) -> Self {
        let mut used: Vec<Location> = used.into_iter().filter(Location::is_valid).collect();
        used.sort();

        let mut free = BTreeMap::new();
        let mut cursor = 0u64;
        for loc in used {
            if loc.first() > cursor {
                free.insert(cursor, loc.first());
            }
            cursor = cursor.max(loc.end());
        }
        free.insert(cursor, u64::MAX);
        Self { free }
    }

    fn is_terminal(end: u64) -> bool {
        end == u64::MAX
    }

    /// A bounded range can serve `need` bytes if it is consumed exactly or
    /// leaves room for at least one filler header.
    fn fits(available: u64, need: u64) -> bool {
        available == need || available >= need.saturating_add(MIN_HOLE)
    }

    fn take(&mut self, first: u64, end: u64, size: u64) -> Location {
        self.free.remove(&first);
        let taken_end = first + size;
        if taken_end < end {
            self.free.insert(taken_end, end);
        }
        Location::new(first, size)
    }

    /// Allocates exactly `size` bytes, first-fit.
    pub fn ualloc(&mut self, size: u64) -> Location {
        let (first, end) = self
            .free
            .iter()
            .map(|(&first, &end)| (first, end))
            .find(|&(first, end)| Self::is_terminal(end) || Self::fits(end - first, size))
            .unwrap_or_else(|| self.tail());
        log::trace!("ualloc({}) -> {:#x}", size, first);
        self.take(first, end, size)
    }

    /// Allocates room for a record whose payload, starting `header_size`
    /// bytes into the allocation, must be a multiple of `alignment`.
    ///
    /// The returned location may be larger than `size`; the difference is
    /// padding to be added to the header's extra field.
    pub fn alloc(&mut self, size: u64, header_size: u64, alignment: u64) -> Location {
        if alignment <= 1 {
            return self.ualloc(size);
        }
        let padding_at = |first: u64| {
            let misalignment = (first + header_size) % alignment;
            (alignment - misalignment) % alignment
        };
        let (first, end, padding) = self
            .free
            .iter()
            .map(|(&first, &end)| (first, end, padding_at(first)))
            .find(|&(first, end, padding)| {
                Self::is_terminal(end) || Self::fits(end - first, size + padding)
            })
            .unwrap_or_else(|| {
                let (first, end) = self.tail();
                (first, end, padding_at(first))
            });
        log::trace!(
            "alloc({}, align {}) -> {:#x} (+{} padding)",
            size,
            alignment,
            first,
            padding
        );
        self.take(first, end, size + padding)
    }

    /// Returns a range to the store, merging it with adjacent free ranges.
    pub fn free(&mut self, location: Location) {
        if !location.is_valid() || location.size() == 0 {
            return;
        }
        let mut first = location.first();
        let mut end = location.end();

        if let Some((&prev_first, &prev_end)) = self.free.range(..first).next_back() {
            if prev_end == first {
                self.free.remove(&prev_first);
                first = prev_first;
            }
        }
        if let Some(&next_end) = self.free.get(&end) {
            self.free.remove(&end);
            end = next_end;
        }
        self.free.insert(first, end);
    }

    /// All free ranges in offset order, the unbounded one last.
    pub fn free_locations(&self) -> Vec<Location> {
        self.free
            .iter()
            .map(|(&first, &end)| Location::from_bounds(first, end))
            .collect()
    }

    /// The unbounded range where the Central Directory goes.
    pub fn last_free_location(&self) -> Location {
        let (first, end) = self.tail();
        Location::from_bounds(first, end)
    }

    fn tail(&self) -> (u64, u64) {
        self.free
            .iter()
            .next_back()
            .map(|(&first, &end)| (first, end))
            .unwrap_or((0, u64::MAX))
    }
}
