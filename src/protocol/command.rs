//! Command definitions
//!
//! Represents requests from clients.

use crate::error::{EmberError, Result};

/// Command types, echoed back in every response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Set = 0x02,
    Remove = 0x03,
}

impl CommandType {
    /// Parse a command type byte
    pub fn from_byte(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(CommandType::Get),
            0x02 => Ok(CommandType::Set),
            0x03 => Ok(CommandType::Remove),
            other => Err(EmberError::Protocol(format!(
                "Unknown command type: 0x{:02x}",
                other
            ))),
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Get { key: Vec<u8> },

    /// Set a key to a value
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Remove a key
    Remove { key: Vec<u8> },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Remove { .. } => CommandType::Remove,
        }
    }

    /// The key this command targets
    pub fn key(&self) -> &[u8] {
        match self {
            Command::Get { key } | Command::Set { key, .. } | Command::Remove { key } => key,
        }
    }
}
