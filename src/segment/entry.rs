//! Segment entry codec
//!
//! Encodes a single Set/Remove record into its on-disk form and validates
//! it on the way back.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::error::{EmberError, Result};

/// Fixed header size: crc (4) + timestamp (4) + op (1) + key len (4) + value len (4)
pub const HEADER_SIZE: usize = 17;

/// Byte offset where the checksummed region starts
const CHECKSUM_LEN: usize = 4;

/// Operation recorded by an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpKind {
    /// Tombstone: the key is deleted as of this entry
    Remove = 0,

    /// The key maps to the entry's value
    Set = 1,
}

impl TryFrom<u8> for OpKind {
    type Error = DecodeError;

    fn try_from(value: u8) -> std::result::Result<Self, DecodeError> {
        match value {
            0 => Ok(OpKind::Remove),
            1 => Ok(OpKind::Set),
            other => Err(DecodeError::UnknownOpKind(other)),
        }
    }
}

/// Reasons an entry fails validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("checksum mismatch: stored 0x{expected:08x}, computed 0x{actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("truncated entry: need {needed} bytes, have {available}")]
    Truncated { needed: u64, available: u64 },

    #[error("unknown operation tag 0x{0:02x}")]
    UnknownOpKind(u8),

    #[error("tombstone carries a {len}-byte value")]
    TombstoneWithValue { len: u32 },

    #[error("entry length mismatch: header declares {declared} bytes, span is {actual}")]
    LengthMismatch { declared: u64, actual: u64 },
}

/// Parsed fixed-size header of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub checksum: u32,
    pub timestamp: u32,
    pub kind: OpKind,
    pub key_len: u32,
    pub value_len: u32,
}

impl EntryHeader {
    /// Total encoded length of the entry this header starts
    pub fn entry_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.key_len as u64 + self.value_len as u64
    }
}

/// Parse the header at the start of `bytes`
///
/// Validates the op tag but not the checksum, which needs the whole entry.
pub fn decode_header(bytes: &[u8]) -> std::result::Result<EntryHeader, DecodeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DecodeError::Truncated {
            needed: HEADER_SIZE as u64,
            available: bytes.len() as u64,
        });
    }

    let mut buf = &bytes[..HEADER_SIZE];
    let checksum = buf.get_u32_le();
    let timestamp = buf.get_u32_le();
    let kind = OpKind::try_from(buf.get_u8())?;
    let key_len = buf.get_u32_le();
    let value_len = buf.get_u32_le();

    if kind == OpKind::Remove && value_len != 0 {
        return Err(DecodeError::TombstoneWithValue { len: value_len });
    }

    Ok(EntryHeader {
        checksum,
        timestamp,
        kind,
        key_len,
        value_len,
    })
}

/// Validate a complete encoded entry and return its header
///
/// `bytes` must be exactly one entry: the span length is checked against the
/// header before the checksum is recomputed.
pub fn verify(bytes: &[u8]) -> std::result::Result<EntryHeader, DecodeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DecodeError::Truncated {
            needed: HEADER_SIZE as u64,
            available: bytes.len() as u64,
        });
    }

    let mut lengths = &bytes[9..HEADER_SIZE];
    let declared = HEADER_SIZE as u64 + lengths.get_u32_le() as u64 + lengths.get_u32_le() as u64;
    if declared != bytes.len() as u64 {
        return Err(DecodeError::LengthMismatch {
            declared,
            actual: bytes.len() as u64,
        });
    }

    let expected = (&bytes[..CHECKSUM_LEN]).get_u32_le();
    let actual = crc32fast::hash(&bytes[CHECKSUM_LEN..]);
    if expected != actual {
        return Err(DecodeError::ChecksumMismatch { expected, actual });
    }

    decode_header(bytes)
}

/// Validate an encoded entry and copy out its value
pub fn decode_value(bytes: &[u8]) -> std::result::Result<Vec<u8>, DecodeError> {
    let header = verify(bytes)?;
    let start = HEADER_SIZE + header.key_len as usize;
    Ok(bytes[start..].to_vec())
}

/// Encode an entry from borrowed parts
pub fn encode_entry(kind: OpKind, timestamp: u32, key: &[u8], value: &[u8]) -> Result<Bytes> {
    let key_len = u32::try_from(key.len()).map_err(|_| EmberError::EntryTooLarge {
        field: "key",
        len: key.len(),
    })?;
    let value_len = u32::try_from(value.len()).map_err(|_| EmberError::EntryTooLarge {
        field: "value",
        len: value.len(),
    })?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + key.len() + value.len());
    buf.put_u32_le(0); // checksum placeholder
    buf.put_u32_le(timestamp);
    buf.put_u8(kind as u8);
    buf.put_u32_le(key_len);
    buf.put_u32_le(value_len);
    buf.put_slice(key);
    buf.put_slice(value);

    let checksum = crc32fast::hash(&buf[CHECKSUM_LEN..]);
    buf[..CHECKSUM_LEN].copy_from_slice(&checksum.to_le_bytes());

    Ok(buf.freeze())
}

/// Current unix time in seconds, truncated to 32 bits
pub fn now_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// An owned, decoded entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Truncated unix seconds when the entry was written
    pub timestamp: u32,

    /// Set or Remove
    pub kind: OpKind,

    pub key: Vec<u8>,

    /// Always empty for a Remove
    pub value: Vec<u8>,
}

impl Entry {
    /// A Set entry stamped with the current time
    pub fn set(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp: now_timestamp(),
            kind: OpKind::Set,
            key: key.into(),
            value: value.into(),
        }
    }

    /// A Remove entry stamped with the current time
    pub fn remove(key: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp: now_timestamp(),
            kind: OpKind::Remove,
            key: key.into(),
            value: Vec::new(),
        }
    }

    /// Encode to the on-disk format
    pub fn encode(&self) -> Result<Bytes> {
        encode_entry(self.kind, self.timestamp, &self.key, &self.value)
    }

    /// Decode and validate exactly one encoded entry
    pub fn decode(bytes: &[u8]) -> std::result::Result<Self, DecodeError> {
        let header = verify(bytes)?;
        let key_end = HEADER_SIZE + header.key_len as usize;

        Ok(Self {
            timestamp: header.timestamp,
            kind: header.kind,
            key: bytes[HEADER_SIZE..key_end].to_vec(),
            value: bytes[key_end..].to_vec(),
        })
    }

    /// Size of this entry once encoded
    pub fn encoded_len(&self) -> u64 {
        (HEADER_SIZE + self.key.len() + self.value.len()) as u64
    }
}
