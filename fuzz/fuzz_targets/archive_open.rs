//! Fuzz target for ZipMap::from_reader with arbitrary byte input.
//!
//! Exercises EOCD search, Zip64 footer handling and the local header checks
//! with malformed input. Any panic or hang is a bug.
//!
//! Run with: cargo +nightly fuzz run archive_open

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use zipsplice::{Zip64Policy, ZipMap};

fuzz_target!(|data: &[u8]| {
    for account in [true, false] {
        let mut cursor = Cursor::new(data);
        if let Ok(map) = ZipMap::from_reader(&mut cursor, account, Zip64Policy::Allow) {
            for entry in map.entries().values() {
                let _ = entry.location();
                let _ = entry.payload_location();
                let _ = entry.is_directory();
                let _ = entry.compression.is_compressed();
            }
            let _ = map.nameless_locations().len();
        }
    }
});
