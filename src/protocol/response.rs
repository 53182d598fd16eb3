//! Response definitions
//!
//! Represents responses to clients.

use crate::error::{EmberError, Result};

use super::CommandType;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
}

impl Status {
    /// Parse a status byte
    pub fn from_byte(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Status::Ok),
            0x01 => Ok(Status::NotFound),
            0x02 => Ok(Status::Error),
            other => Err(EmberError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                other
            ))),
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Kind of the request this answers
    pub kind: CommandType,

    /// Value for a successful GET
    pub value: Option<Vec<u8>>,

    /// Error message; empty on success
    pub error: String,
}

impl Response {
    /// Create an OK response with optional value
    pub fn ok(kind: CommandType, value: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            kind,
            value,
            error: String::new(),
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found(kind: CommandType) -> Self {
        Self {
            status: Status::NotFound,
            kind,
            value: None,
            error: EmberError::KeyNotFound.to_string(),
        }
    }

    /// Create an ERROR response
    pub fn error(kind: CommandType, message: &str) -> Self {
        Self {
            status: Status::Error,
            kind,
            value: None,
            error: message.to_string(),
        }
    }

    /// Build the response for an engine result
    pub fn from_result(kind: CommandType, result: Result<Option<Vec<u8>>>) -> Self {
        match result {
            Ok(value) => Self::ok(kind, value),
            Err(EmberError::KeyNotFound) => Self::not_found(kind),
            Err(e) => Self::error(kind, &e.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}
