//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Kind (1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - GET:    key_len (4 bytes) + key
//! - SET:    key_len (4 bytes) + key + value
//! - REMOVE: key_len (4 bytes) + key
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Kind (1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴──────────┴─────────────────────────────┘
//! ```
//! Payload is the value for an OK GET, empty for an OK SET/REMOVE, and the
//! UTF-8 error message otherwise. All integers are big-endian.

use std::io::{Read, Write};

use bytes::{Buf, BufMut};

use crate::error::{EmberError, Result};

use super::{Command, CommandType, Response, Status};

/// Header size: 1 byte kind + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Response header size: 1 byte status + 1 byte kind + 4 bytes length
pub const RESPONSE_HEADER_SIZE: usize = 6;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: kind (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let key = command.key();
    let value: &[u8] = match command {
        Command::Set { value, .. } => value,
        Command::Get { .. } | Command::Remove { .. } => &[],
    };

    let payload_len = 4 + key.len() + value.len();
    let mut message = Vec::with_capacity(HEADER_SIZE + payload_len);
    message.put_u8(command.command_type() as u8);
    message.put_u32(payload_len as u32);
    message.put_u32(key.len() as u32);
    message.put_slice(key);
    message.put_slice(value);

    message
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    if bytes.len() < HEADER_SIZE {
        return Err(EmberError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    // Parse header
    let mut header = &bytes[..HEADER_SIZE];
    let kind = CommandType::from_byte(header.get_u8())?;
    let payload_len = checked_payload_len(header.get_u32())?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(EmberError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    let payload = &bytes[HEADER_SIZE..total_len];
    let (key, rest) = split_key(kind, payload)?;

    // Parse command based on type
    match kind {
        CommandType::Get => {
            expect_no_trailing(kind, rest)?;
            Ok(Command::Get { key })
        }
        CommandType::Set => Ok(Command::Set {
            key,
            value: rest.to_vec(),
        }),
        CommandType::Remove => {
            expect_no_trailing(kind, rest)?;
            Ok(Command::Remove { key })
        }
    }
}

/// Split `key_len (4) + key` off the front of a payload
fn split_key(kind: CommandType, payload: &[u8]) -> Result<(Vec<u8>, &[u8])> {
    if payload.len() < 4 {
        return Err(EmberError::Protocol(format!(
            "{:?} command: missing key length",
            kind
        )));
    }

    let mut cursor = payload;
    let key_len = cursor.get_u32() as usize;

    if cursor.len() < key_len {
        return Err(EmberError::Protocol(format!(
            "{:?} command: incomplete key (expected {}, got {})",
            kind,
            key_len,
            cursor.len()
        )));
    }

    let (key, rest) = cursor.split_at(key_len);
    Ok((key.to_vec(), rest))
}

fn expect_no_trailing(kind: CommandType, rest: &[u8]) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(EmberError::Protocol(format!(
            "{:?} command: unexpected {} trailing bytes",
            kind,
            rest.len()
        )))
    }
}

fn checked_payload_len(len: u32) -> Result<usize> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(EmberError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + kind (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload: &[u8] = match response.status {
        Status::Ok => response.value.as_deref().unwrap_or(&[]),
        Status::NotFound | Status::Error => response.error.as_bytes(),
    };

    let mut message = Vec::with_capacity(RESPONSE_HEADER_SIZE + payload.len());
    message.put_u8(response.status as u8);
    message.put_u8(response.kind as u8);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);

    message
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    if bytes.len() < RESPONSE_HEADER_SIZE {
        return Err(EmberError::Protocol(format!(
            "Incomplete response header: expected {} bytes, got {}",
            RESPONSE_HEADER_SIZE,
            bytes.len()
        )));
    }

    // Parse header
    let mut header = &bytes[..RESPONSE_HEADER_SIZE];
    let status = Status::from_byte(header.get_u8())?;
    let kind = CommandType::from_byte(header.get_u8())?;
    let payload_len = checked_payload_len(header.get_u32())?;

    let total_len = RESPONSE_HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(EmberError::Protocol(format!(
            "Incomplete response payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    let payload = &bytes[RESPONSE_HEADER_SIZE..total_len];

    match (status, kind) {
        (Status::Ok, CommandType::Get) => Ok(Response::ok(kind, Some(payload.to_vec()))),
        (Status::Ok, _) => {
            if !payload.is_empty() {
                return Err(EmberError::Protocol(format!(
                    "{:?} response: unexpected {}-byte payload",
                    kind,
                    payload.len()
                )));
            }
            Ok(Response::ok(kind, None))
        }
        (status, kind) => Ok(Response {
            status,
            kind,
            value: None,
            error: String::from_utf8_lossy(payload).into_owned(),
        }),
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = checked_payload_len((&header[1..]).get_u32())?;
    let message = read_rest(reader, &header, payload_len)?;

    decode_command(&message)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let mut header = [0u8; RESPONSE_HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = checked_payload_len((&header[2..]).get_u32())?;
    let message = read_rest(reader, &header, payload_len)?;

    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read `payload_len` bytes after an already-read header and join them
fn read_rest<R: Read>(reader: &mut R, header: &[u8], payload_len: usize) -> Result<Vec<u8>> {
    let mut message = vec![0u8; header.len() + payload_len];
    message[..header.len()].copy_from_slice(header);
    if payload_len > 0 {
        reader.read_exact(&mut message[header.len()..])?;
    }
    Ok(message)
}
