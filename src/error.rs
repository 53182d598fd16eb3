//! Error types for EmberKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::segment::DecodeError;

/// Result type alias using EmberError
pub type Result<T> = std::result::Result<T, EmberError>;

/// Unified error type for EmberKV operations
#[derive(Debug, Error)]
pub enum EmberError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Segment Errors
    // -------------------------------------------------------------------------
    /// An entry failed checksum or structural validation
    #[error("Corrupted entry in segment {generation} at offset {offset}: {source}")]
    Corruption {
        generation: u64,
        offset: u64,
        #[source]
        source: DecodeError,
    },

    /// Replay found a tombstone for a key that was never live
    #[error(
        "Inconsistent log: segment {generation} offset {offset} removes absent key {key:?}"
    )]
    LogicalInconsistency {
        generation: u64,
        offset: u64,
        key: Vec<u8>,
    },

    /// The index points at a generation with no open reader
    #[error("Segment {generation} is not open")]
    MissingSegment { generation: u64 },

    #[error("Unexpected file in data directory: {filename}")]
    InvalidSegmentName { filename: String },

    #[error("{field} too large: {len} bytes (max {max})", max = u32::MAX)]
    EntryTooLarge { field: &'static str, len: usize },

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Error message returned by a remote server
    #[error("Server error: {0}")]
    Remote(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
