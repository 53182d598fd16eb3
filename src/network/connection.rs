//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{EmberError, Result};
use crate::protocol::{read_command, write_response, Command, Response};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the storage engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and disables Nagle's algorithm
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            engine,
            peer_addr,
        })
    }

    /// Configure connection timeouts; zero leaves a direction unbounded
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in a loop and sends one response per command.
    /// Returns when the client disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(EmberError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(EmberError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    // Windows reports TimedOut where unix reports WouldBlock
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    // The request kind is unknown, so there is nothing to echo back
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            tracing::trace!("Received command from {}: {:?}", self.peer_addr, command.command_type());

            let response = self.execute_command(command);

            if let Err(e) = self.send_response(&response) {
                if let EmberError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Execute a command and return a response
    fn execute_command(&self, command: Command) -> Response {
        let kind = command.command_type();
        let result = self.engine.execute(command);

        if let Err(ref e) = result {
            if !matches!(e, EmberError::KeyNotFound) {
                tracing::error!("{:?} from {} failed: {}", kind, self.peer_addr, e);
            }
        }

        Response::from_result(kind, result)
    }

    fn send_response(&mut self, response: &Response) -> Result<()> {
        write_response(&mut self.writer, response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}
