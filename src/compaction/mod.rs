//! Compaction Module
//!
//! Reclaims space held by overwritten and removed entries.
//!
//! ## Responsibilities
//! - Count reclaimable bytes reported by Set/Remove
//! - Wake the background worker once the count crosses the threshold
//! - Merge every live entry into a fresh segment
//! - Retire every segment older than the merge output
//!
//! ## State Machine
//! ```text
//!            pending >= threshold
//!   ┌──────┐ ───────────────────▶ ┌─────────┐
//!   │ Idle │                      │ Merging │
//!   └──────┘ ◀─────────────────── └─────────┘
//!               merge finished
//! ```
//! Foreground writers only bump an atomic counter; the merge itself runs on
//! the worker thread. The wake-up channel holds at most one message, so a
//! burst of writes can never queue more than one pending merge.

mod merge;
mod worker;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, MutexGuard};

pub use merge::MergeReport;
pub(crate) use merge::merge;
pub(crate) use worker::CompactionWorker;

/// Observable coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionState {
    /// Accumulating reclaimable bytes
    Idle,

    /// A merge is scheduled or running
    Merging,
}

/// Messages understood by the compaction worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    Compact,
    Shutdown,
}

/// Tracks reclaimable bytes and decides when to merge
pub(crate) struct Coordinator {
    threshold: u64,

    /// Reclaimable bytes reported since the last merge started
    pending: AtomicU64,

    merging: AtomicBool,

    /// Held for the whole of a merge; one merge at a time
    merge_lock: Mutex<()>,

    completed: AtomicU64,

    /// Wake-up channel to the worker; `None` when background merging is off
    signal: Option<Sender<Signal>>,
}

impl Coordinator {
    /// Create a coordinator, plus the worker's end of the channel when
    /// background compaction is enabled
    pub(crate) fn new(threshold: u64, background: bool) -> (Self, Option<Receiver<Signal>>) {
        let (signal, receiver) = if background {
            let (tx, rx) = channel::bounded(1);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let coordinator = Self {
            threshold,
            pending: AtomicU64::new(0),
            merging: AtomicBool::new(false),
            merge_lock: Mutex::new(()),
            completed: AtomicU64::new(0),
            signal,
        };
        (coordinator, receiver)
    }

    /// Add stale bytes to the running total, waking the worker if the
    /// threshold is reached
    pub(crate) fn record(&self, stale_bytes: u64) {
        if stale_bytes == 0 {
            return;
        }
        let total = self.pending.fetch_add(stale_bytes, Ordering::AcqRel) + stale_bytes;
        if total >= self.threshold {
            self.trigger();
        }
    }

    /// Idle → Merging, if a worker exists and no merge is already scheduled
    fn trigger(&self) {
        let Some(signal) = &self.signal else {
            return;
        };
        if self
            .merging
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.pending.store(0, Ordering::Release);
        match signal.try_send(Signal::Compact) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                self.merging.store(false, Ordering::Release);
            }
        }
    }

    /// Enter a merge: block out other merges and zero the counter
    pub(crate) fn begin(&self) -> MutexGuard<'_, ()> {
        let guard = self.merge_lock.lock();
        self.merging.store(true, Ordering::Release);
        self.pending.store(0, Ordering::Release);
        guard
    }

    /// Merging → Idle; stale bytes left by the merge are counted afresh
    pub(crate) fn finish(&self, succeeded: bool, stale_bytes: u64) {
        if succeeded {
            self.completed.fetch_add(1, Ordering::AcqRel);
        }
        self.merging.store(false, Ordering::Release);
        self.record(stale_bytes);
        if self.pending.load(Ordering::Acquire) >= self.threshold {
            self.trigger();
        }
    }

    /// Ask the worker to exit after any merge in progress
    pub(crate) fn shutdown(&self) {
        if let Some(signal) = &self.signal {
            // A blocking send: the worker drains the channel until it sees this
            let _ = signal.send(Signal::Shutdown);
        }
    }

    pub(crate) fn state(&self) -> CompactionState {
        if self.merging.load(Ordering::Acquire) {
            CompactionState::Merging
        } else {
            CompactionState::Idle
        }
    }

    pub(crate) fn pending(&self) -> u64 {
        self.pending.load(Ordering::Acquire)
    }

    pub(crate) fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub(crate) fn threshold(&self) -> u64 {
        self.threshold
    }
}
