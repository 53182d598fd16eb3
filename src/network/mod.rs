//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread polling a shutdown flag
//! - One thread per connection, capped at `max_connections`
//! - Commands routed through Engine

mod server;
mod connection;
mod client;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
pub use client::Client;
