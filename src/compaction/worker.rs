//! Background compaction worker
//!
//! A dedicated thread that sleeps on the wake-up channel and runs merges.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::Receiver;

use crate::engine::Shared;

use super::Signal;

/// Handle to the running worker thread
pub(crate) struct CompactionWorker {
    handle: Option<JoinHandle<()>>,
}

impl CompactionWorker {
    /// Start the worker for `shared`
    pub(crate) fn spawn(shared: Arc<Shared>, inbox: Receiver<Signal>) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name("emberkv-compaction".to_string())
            .spawn(move || run(shared, inbox))?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the worker to exit; the caller sends `Signal::Shutdown` first
    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Compaction worker panicked");
            }
        }
    }
}

fn run(shared: Arc<Shared>, inbox: Receiver<Signal>) {
    tracing::debug!("Compaction worker started");

    while let Ok(signal) = inbox.recv() {
        match signal {
            Signal::Compact => {
                // Failures are logged by run_merge; old segments stay intact
                let _ = shared.run_merge();
            }
            Signal::Shutdown => break,
        }
    }

    tracing::debug!("Compaction worker quitting");
}
