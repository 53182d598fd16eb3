//! Segment Reader
//!
//! Positioned reads of individual entries, plus a sequential scanner used
//! by replay.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{EmberError, Result};

use super::entry::{decode_header, decode_value, verify, DecodeError, Entry, HEADER_SIZE};
use super::segment_path;

/// Random-access reader for one generation
///
/// Reads never touch a shared cursor, so one reader can serve any number of
/// threads at once.
#[derive(Debug)]
pub struct SegmentReader {
    generation: u64,
    path: PathBuf,
    file: File,
}

impl SegmentReader {
    /// Open the segment file for `generation` inside `dir`
    pub fn open(dir: &Path, generation: u64) -> Result<Self> {
        let path = segment_path(dir, generation);
        let file = File::open(&path)?;
        Ok(Self {
            generation,
            path,
            file,
        })
    }

    /// Read exactly `length` bytes at `offset` and verify them as one entry
    pub fn read_raw(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; length as usize];

        if let Err(e) = read_exact_at(&self.file, &mut buf, offset) {
            if e.kind() != io::ErrorKind::UnexpectedEof {
                return Err(e.into());
            }
            let file_len = self.file.metadata()?.len();
            return Err(self.corruption(
                offset,
                DecodeError::Truncated {
                    needed: length,
                    available: file_len.saturating_sub(offset),
                },
            ));
        }

        verify(&buf).map_err(|e| self.corruption(offset, e))?;
        Ok(buf)
    }

    /// Read the entry at `offset` and return its value
    pub fn read_entry(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let raw = self.read_raw(offset, length)?;
        decode_value(&raw).map_err(|e| self.corruption(offset, e))
    }

    /// Generation this reader serves
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Path of the underlying segment file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corruption(&self, offset: u64, source: DecodeError) -> EmberError {
        EmberError::Corruption {
            generation: self.generation,
            offset,
            source,
        }
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

// =============================================================================
// Sequential Scanner
// =============================================================================

/// An entry found by the scanner, with its span in the segment
#[derive(Debug, Clone)]
pub struct ScannedEntry {
    pub offset: u64,
    pub length: u64,
    pub entry: Entry,
}

/// Reads a segment front to back
///
/// A trailing entry cut short by end-of-file (a torn write) ends the scan
/// and is reported through `torn_bytes()`. A complete entry that fails
/// validation is an error, and so is a short tail that still has a valid
/// entry somewhere after it: that is a damaged length field, not a torn
/// write.
pub struct SegmentScanner {
    generation: u64,
    reader: BufReader<File>,
    file_len: u64,
    position: u64,
    torn_bytes: u64,
    tolerate_torn_tail: bool,
    done: bool,
}

impl SegmentScanner {
    /// Open the segment for `generation` inside `dir` for scanning
    pub fn open(dir: &Path, generation: u64) -> Result<Self> {
        let file = File::open(segment_path(dir, generation))?;
        let file_len = file.metadata()?.len();

        Ok(Self {
            generation,
            reader: BufReader::new(file),
            file_len,
            position: 0,
            torn_bytes: 0,
            tolerate_torn_tail: true,
            done: false,
        })
    }

    /// Whether a short trailing entry ends the scan (the default) or is
    /// reported as corruption
    ///
    /// Only the segment that was last appended to can hold a torn write.
    pub fn tolerate_torn_tail(mut self, tolerate: bool) -> Self {
        self.tolerate_torn_tail = tolerate;
        self
    }

    /// Decode the next entry, or `None` at end of segment
    pub fn next_entry(&mut self) -> Result<Option<ScannedEntry>> {
        if self.done {
            return Ok(None);
        }

        let remaining = self.file_len - self.position;
        if remaining == 0 {
            self.done = true;
            return Ok(None);
        }
        if remaining < HEADER_SIZE as u64 {
            return self.torn(HEADER_SIZE as u64, remaining, &[]);
        }

        let mut header_buf = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut header_buf)?;
        let header = decode_header(&header_buf).map_err(|e| self.corruption(e))?;

        let length = header.entry_len();
        if length > remaining {
            let mut tail = header_buf.to_vec();
            self.reader.read_to_end(&mut tail)?;
            return self.torn(length, remaining, &tail);
        }

        let mut raw = Vec::with_capacity(length as usize);
        raw.extend_from_slice(&header_buf);
        raw.resize(length as usize, 0);
        self.reader.read_exact(&mut raw[HEADER_SIZE..])?;

        let entry = Entry::decode(&raw).map_err(|e| self.corruption(e))?;
        let offset = self.position;
        self.position += length;

        Ok(Some(ScannedEntry {
            offset,
            length,
            entry,
        }))
    }

    /// Generation being scanned
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Offset just past the last complete entry
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes of an incomplete trailing entry, if the scan hit one
    pub fn torn_bytes(&self) -> u64 {
        self.torn_bytes
    }

    /// Handle a tail of `remaining` bytes that cannot hold the `needed`
    /// bytes of the entry starting there
    fn torn(
        &mut self,
        needed: u64,
        remaining: u64,
        tail: &[u8],
    ) -> Result<Option<ScannedEntry>> {
        self.done = true;

        if !self.tolerate_torn_tail || holds_valid_entry(tail) {
            return Err(self.corruption(DecodeError::Truncated {
                needed,
                available: remaining,
            }));
        }

        self.torn_bytes = remaining;
        Ok(None)
    }

    fn corruption(&self, source: DecodeError) -> EmberError {
        EmberError::Corruption {
            generation: self.generation,
            offset: self.position,
            source,
        }
    }
}

/// Whether a complete, checksum-valid entry starts anywhere past the first
/// byte of `tail`
fn holds_valid_entry(tail: &[u8]) -> bool {
    (1..tail.len()).any(|start| {
        let candidate = &tail[start..];
        match decode_header(candidate) {
            Ok(header) => match usize::try_from(header.entry_len()) {
                Ok(len) if len <= candidate.len() => verify(&candidate[..len]).is_ok(),
                _ => false,
            },
            Err(_) => false,
        }
    })
}

impl Iterator for SegmentScanner {
    type Item = Result<ScannedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
