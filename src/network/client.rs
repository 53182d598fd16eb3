//! Blocking TCP client
//!
//! One request in flight at a time over a single connection.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{EmberError, Result};
use crate::protocol::{read_response, write_command, Command, Response, Status};

/// Client for a running EmberKV server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to the server at `addr`
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Get the value stored for `key`
    pub fn get(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        let response = self.call(Command::Get { key: key.to_vec() })?;
        response
            .value
            .ok_or_else(|| EmberError::Protocol("GET response without a value".to_string()))
    }

    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.call(Command::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;
        Ok(())
    }

    /// Remove `key`; an absent key is reported as `KeyNotFound`
    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        self.call(Command::Remove { key: key.to_vec() })?;
        Ok(())
    }

    /// Send one command and map the response status onto a `Result`
    fn call(&mut self, command: Command) -> Result<Response> {
        let kind = command.command_type();
        write_command(&mut self.writer, &command)?;
        let response = read_response(&mut self.reader)?;

        // Connection-level errors may carry any kind, so check status first
        if response.status == Status::Error {
            return Err(EmberError::Remote(response.error));
        }

        if response.kind != kind {
            return Err(EmberError::Protocol(format!(
                "Response kind {:?} does not match request {:?}",
                response.kind, kind
            )));
        }

        match response.status {
            Status::Ok => Ok(response),
            Status::NotFound => Err(EmberError::KeyNotFound),
            Status::Error => Err(EmberError::Remote(response.error)),
        }
    }
}
