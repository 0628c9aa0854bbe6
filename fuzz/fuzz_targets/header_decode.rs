//! Fuzz target for the local and central header decoders.
//!
//! Decoded headers are re-encoded; a header that decodes must encode to
//! exactly its reported size.
//!
//! Run with: cargo +nightly fuzz run header_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use zipsplice::format::{CentralDirectoryRecord, LocalFileHeader};

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = LocalFileHeader::decode(data) {
        assert_eq!(header.encode().len() as u64, header.encoded_size());
    }
    if let Ok(record) = CentralDirectoryRecord::decode(data) {
        let _ = record.name();
        let _ = record.local_header_offset();
    }
});
