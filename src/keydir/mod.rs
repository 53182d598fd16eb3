//! KeyDir Module
//!
//! In-memory index from key to the location of its latest live entry.
//!
//! ## Responsibilities
//! - O(1) lookup of where a key's value lives on disk
//! - Decide liveness: a key is live iff it has a Location
//! - Stable snapshots for compaction
//! - Compare-and-swap relocation so a merge never clobbers newer writes
//!
//! ## Data Structure Choice
//! A plain `HashMap`: keys need no ordering. Locking is done one level up by
//! the engine, which guards the KeyDir together with the active writer.

mod table;

pub use table::KeyDir;

/// Byte span of one entry inside one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// Segment the entry lives in
    pub generation: u64,

    /// Offset of the entry's first byte
    pub offset: u64,

    /// Encoded length of the whole entry (header included)
    pub length: u64,
}

impl Location {
    pub fn new(generation: u64, offset: u64, length: u64) -> Self {
        Self {
            generation,
            offset,
            length,
        }
    }
}
