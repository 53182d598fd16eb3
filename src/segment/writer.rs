//! Segment Writer
//!
//! Appends entries to the active segment file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::entry::{encode_entry, now_timestamp, OpKind};
use super::segment_path;

/// Append-only writer bound to one generation
///
/// The position only moves forward. Bytes sit in a user-space buffer until
/// `flush()`, which hands them to the OS; nothing here calls fsync.
pub struct SegmentWriter {
    generation: u64,
    path: PathBuf,
    writer: BufWriter<File>,
    /// Offset the next entry will be written at
    position: u64,
}

impl SegmentWriter {
    /// Create a new, empty segment file for `generation` inside `dir`
    ///
    /// Fails if the file already exists: generations are never reused.
    pub fn create(dir: &Path, generation: u64) -> Result<Self> {
        let path = segment_path(dir, generation);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;

        Ok(Self {
            generation,
            path,
            writer: BufWriter::new(file),
            position: 0,
        })
    }

    /// Encode and append an entry
    ///
    /// Returns `(offset, length)` of the entry within the segment.
    pub fn append(&mut self, key: &[u8], value: &[u8], kind: OpKind) -> Result<(u64, u64)> {
        let bytes = encode_entry(kind, now_timestamp(), key, value)?;
        self.append_raw(&bytes)
    }

    /// Append an already-encoded entry verbatim
    pub fn append_raw(&mut self, bytes: &[u8]) -> Result<(u64, u64)> {
        self.writer.write_all(bytes)?;

        let offset = self.position;
        let length = bytes.len() as u64;
        self.position += length;

        Ok((offset, length))
    }

    /// Push buffered bytes to the operating system
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Generation this writer appends to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bytes written so far (also the next entry's offset)
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Path of the underlying segment file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and release the file handle
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }
}
