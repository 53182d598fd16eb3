//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{write_response, CommandType, Response};

use super::Connection;

/// How long the accept loop sleeps when no connection is waiting
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server for EmberKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

/// Cloneable handle that stops a running server's accept loop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

impl Server {
    /// Bind the listen address from `config`
    ///
    /// Binding happens here rather than in `run` so callers can learn the
    /// real port when `listen_addr` asks for port 0.
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Listening");

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Signal the server to shutdown gracefully
    ///
    /// The accept loop exits within one poll interval. Connections already
    /// being served run until their client disconnects or times out.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&self) -> Result<()> {
        while !self.shutdown.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, peer)) => self.dispatch(stream, peer),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Accept loop stopped");
        Ok(())
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        // Some platforms hand out sockets that inherit the listener's mode
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping connection from {}: {}", peer, e);
            return;
        }

        let previous = self.active.fetch_add(1, Ordering::AcqRel);
        if previous >= self.config.max_connections {
            self.active.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!(
                peer = %peer,
                max_connections = self.config.max_connections,
                "Connection limit reached, rejecting"
            );
            reject(stream, self.config.max_connections);
            return;
        }

        let engine = Arc::clone(&self.engine);
        let active = Arc::clone(&self.active);
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        let spawned = thread::Builder::new()
            .name(format!("emberkv-conn-{}", peer))
            .spawn(move || {
                serve(stream, engine, read_ms, write_ms);
                active.fetch_sub(1, Ordering::AcqRel);
            });

        if let Err(e) = spawned {
            self.active.fetch_sub(1, Ordering::AcqRel);
            tracing::error!("Failed to spawn connection thread for {}: {}", peer, e);
        }
    }
}

fn serve(stream: TcpStream, engine: Arc<Engine>, read_ms: u64, write_ms: u64) {
    let mut connection = match Connection::new(stream, engine) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!("Failed to set up connection: {}", e);
            return;
        }
    };

    if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
        tracing::warn!("Failed to set timeouts for {}: {}", connection.peer_addr(), e);
        return;
    }

    if let Err(e) = connection.handle() {
        tracing::debug!("Connection {} closed with error: {}", connection.peer_addr(), e);
    }
}

/// Tell an over-limit client why it is being dropped, then close
fn reject(mut stream: TcpStream, max_connections: usize) {
    let message = format!("connection limit reached ({} max)", max_connections);
    let response = Response::error(CommandType::Get, &message);
    let _ = write_response(&mut stream, &response);
}
