//! Segment Module
//!
//! Append-only log files, one per generation.
//!
//! ## Responsibilities
//! - Encode every Set/Remove as a self-checking entry
//! - Append entries to the single active segment
//! - Positioned reads of individual entries from any segment
//! - Crash recovery by replaying every segment in generation order
//!
//! ## File Format
//! ```text
//! {data_dir}/{generation}.data
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Entry 1                                                      │
//! │ ┌─────────┬──────────┬────────┬─────────┬─────────┬─────┬───┐ │
//! │ │ CRC (4) │ Time (4) │ Op (1) │ KLen(4) │ VLen(4) │ Key │Val│ │
//! │ └─────────┴──────────┴────────┴─────────┴─────────┴─────┴───┘ │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Entry 2 ...                                                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian. The CRC covers every byte after itself.

mod entry;
mod writer;
mod reader;
mod recovery;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EmberError, Result};

pub use entry::{
    decode_header, decode_value, encode_entry, now_timestamp, verify, DecodeError, Entry,
    EntryHeader, OpKind, HEADER_SIZE,
};
pub use writer::SegmentWriter;
pub use reader::{ScannedEntry, SegmentReader, SegmentScanner};
pub use recovery::{replay, Recovered, RecoveryReport};

/// Extension of every segment file
pub const SEGMENT_EXTENSION: &str = "data";

/// Path of the segment file for `generation` inside `dir`
pub fn segment_path(dir: &Path, generation: u64) -> PathBuf {
    dir.join(format!("{}.{}", generation, SEGMENT_EXTENSION))
}

/// Parse a generation from a segment file name
/// "42.data" → Some(42)
pub fn parse_generation(file_name: &str) -> Option<u64> {
    let stem = file_name.strip_suffix(SEGMENT_EXTENSION)?.strip_suffix('.')?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// List every generation present in `dir`, ascending
///
/// Anything that is not a `<generation>.data` file is an error: the data
/// directory belongs to the engine alone.
pub fn list_generations(dir: &Path) -> Result<Vec<u64>> {
    let mut generations = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        match parse_generation(&name) {
            Some(generation) if entry.file_type()?.is_file() => generations.push(generation),
            _ => {
                return Err(EmberError::InvalidSegmentName {
                    filename: name.into_owned(),
                })
            }
        }
    }

    generations.sort_unstable();
    Ok(generations)
}
