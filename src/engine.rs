//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Replay the data directory on open
//! - Serve Get/Set/Remove under one reader-writer lock
//! - Report reclaimable bytes to the compaction coordinator
//! - Release every file handle on close

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::compaction::{self, CompactionState, CompactionWorker, Coordinator, MergeReport};
use crate::config::Config;
use crate::error::{EmberError, Result};
use crate::keydir::{KeyDir, Location};
use crate::protocol::Command;
use crate::segment::{self, OpKind, Recovered, SegmentReader, SegmentWriter};

/// Everything guarded by the engine lock
///
/// The KeyDir and the active writer change together: a Location is only
/// ever installed for bytes the writer has already flushed.
pub(crate) struct EngineState {
    pub(crate) keydir: KeyDir,

    /// Writer for the active (newest) generation
    pub(crate) writer: SegmentWriter,

    /// One reader per generation on disk, active one included
    pub(crate) readers: BTreeMap<u64, SegmentReader>,

    /// Highest generation allocated so far
    pub(crate) generation: u64,
}

/// State shared between the engine handle and the compaction worker
pub(crate) struct Shared {
    config: Config,
    state: RwLock<EngineState>,
    coordinator: Coordinator,
}

impl Shared {
    /// Run one merge, keeping the coordinator's state machine in step
    pub(crate) fn run_merge(&self) -> Result<MergeReport> {
        let _merge_guard = self.coordinator.begin();

        match compaction::merge(&self.config.data_dir, &self.state) {
            Ok(report) => {
                tracing::info!(
                    merge_generation = report.merge_generation,
                    active_generation = report.active_generation,
                    relocated = report.keys_relocated,
                    skipped = report.keys_skipped,
                    bytes_written = report.bytes_written,
                    segments_removed = report.segments_removed,
                    "Compaction finished"
                );
                self.coordinator.finish(true, report.stale_bytes);
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Compaction failed, old segments kept: {}", e);
                self.coordinator.finish(false, 0);
                Err(e)
            }
        }
    }
}

/// The main storage engine
///
/// ## Concurrency Model
///
/// - **Reads** (get): shared lock for the KeyDir lookup and the positioned
///   read, so many readers proceed together
/// - **Writes** (set/remove): exclusive lock for append, flush and KeyDir
///   update; log order equals lock order
/// - **Compaction**: a background thread takes the exclusive lock only to
///   swap writers, relocate a batch of keys, and retire old segments
///
/// ## Durability
///
/// Every Set/Remove is flushed to the operating system before it returns,
/// but never fsynced. A power loss can drop acknowledged writes.
pub struct Engine {
    shared: Arc<Shared>,
    worker: Option<CompactionWorker>,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory if needed
    /// 2. Replay every segment to rebuild the KeyDir
    /// 3. Start a fresh active segment at max generation + 1
    /// 4. Seed the coordinator with the reclaimable bytes found by replay
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let Recovered {
            keydir,
            mut readers,
            report,
        } = segment::replay(&config.data_dir)?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            segments = report.segments,
            entries = report.entries_replayed,
            live_keys = keydir.len(),
            reclaimable_bytes = report.reclaimable_bytes,
            torn_bytes = report.torn_bytes,
            "Replay complete"
        );

        let generation = report.next_generation;
        let writer = SegmentWriter::create(&config.data_dir, generation)?;
        readers.insert(generation, SegmentReader::open(&config.data_dir, generation)?);

        let (coordinator, inbox) =
            Coordinator::new(config.compact_threshold, config.background_compaction);

        let shared = Arc::new(Shared {
            config,
            state: RwLock::new(EngineState {
                keydir,
                writer,
                readers,
                generation,
            }),
            coordinator,
        });

        let worker = match inbox {
            Some(inbox) => Some(CompactionWorker::spawn(Arc::clone(&shared), inbox)?),
            None => None,
        };

        shared.coordinator.record(report.reclaimable_bytes);

        Ok(Self { shared, worker })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Option<Vec<u8>>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some),
            Command::Set { key, value } => {
                self.set(&key, &value)?;
                Ok(None)
            }
            Command::Remove { key } => {
                self.remove(&key)?;
                Ok(None)
            }
        }
    }

    /// Get the value stored for a key
    ///
    /// Fails with `KeyNotFound` for absent keys and `Corruption` when the
    /// stored entry no longer matches its checksum.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let state = self.shared.state.read();

        let location = state.keydir.get(key).ok_or(EmberError::KeyNotFound)?;
        let reader = state
            .readers
            .get(&location.generation)
            .ok_or(EmberError::MissingSegment {
                generation: location.generation,
            })?;

        reader.read_entry(location.offset, location.length)
    }

    /// Set a key to a value
    ///
    /// Steps:
    /// 1. Acquire the write lock
    /// 2. Append a Set entry and flush it
    /// 3. Install the new Location (last writer wins)
    /// 4. Report the replaced entry, if any, as reclaimable
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let stale = {
            let mut state = self.shared.state.write();

            let (offset, length) = state.writer.append(key, value, OpKind::Set)?;
            state.writer.flush()?;

            let location = Location::new(state.writer.generation(), offset, length);
            state
                .keydir
                .insert(key.to_vec(), location)
                .map(|old| old.length)
                .unwrap_or(0)
        };

        self.shared.coordinator.record(stale);
        Ok(())
    }

    /// Remove a key
    ///
    /// Removing an absent key is an error, not a no-op. Both the tombstone
    /// and the entry it supersedes become reclaimable.
    pub fn remove(&self, key: &[u8]) -> Result<()> {
        let stale = {
            let mut state = self.shared.state.write();

            let old = state.keydir.get(key).ok_or(EmberError::KeyNotFound)?;
            let (_, length) = state.writer.append(key, &[], OpKind::Remove)?;
            state.writer.flush()?;
            state.keydir.remove(key);

            old.length + length
        };

        self.shared.coordinator.record(stale);
        Ok(())
    }

    /// Merge all live entries now and wait for it to finish
    ///
    /// Waits for a background merge already in progress, then runs another.
    pub fn compact(&self) -> Result<MergeReport> {
        self.shared.run_merge()
    }

    /// Close the engine gracefully
    ///
    /// Stops the compaction worker (after any merge in progress), flushes the
    /// active segment and releases every file handle.
    pub fn close(mut self) -> Result<()> {
        self.stop_worker();

        let mut state = self.shared.state.write();
        state.writer.flush()?;
        state.readers.clear();

        tracing::debug!(
            data_dir = %self.shared.config.data_dir.display(),
            "Engine closed"
        );
        Ok(())
    }

    fn stop_worker(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            self.shared.coordinator.shutdown();
            worker.join();
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.shared.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Number of live keys
    pub fn key_count(&self) -> usize {
        self.shared.state.read().keydir.len()
    }

    /// Generation currently receiving writes
    pub fn active_generation(&self) -> u64 {
        self.shared.state.read().writer.generation()
    }

    /// Number of segment files currently open
    pub fn segment_count(&self) -> usize {
        self.shared.state.read().readers.len()
    }

    /// Reclaimable bytes reported since the last merge started
    pub fn reclaimable_bytes(&self) -> u64 {
        self.shared.coordinator.pending()
    }

    /// Whether a merge is running right now
    pub fn compaction_state(&self) -> CompactionState {
        self.shared.coordinator.state()
    }

    /// Number of merges completed since open
    pub fn compaction_count(&self) -> u64 {
        self.shared.coordinator.completed()
    }

    /// Point-in-time counters for the whole engine
    pub fn stats(&self) -> EngineStats {
        let (live_keys, live_bytes, active_generation, segments) = {
            let state = self.shared.state.read();
            (
                state.keydir.len(),
                state.keydir.live_bytes(),
                state.writer.generation(),
                state.readers.len(),
            )
        };

        EngineStats {
            live_keys,
            live_bytes,
            active_generation,
            segments,
            reclaimable_bytes: self.shared.coordinator.pending(),
            compact_threshold: self.shared.coordinator.threshold(),
            compactions_completed: self.shared.coordinator.completed(),
            compaction_state: self.shared.coordinator.state(),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

/// Snapshot of engine counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub live_keys: usize,

    /// Encoded bytes of all live entries
    pub live_bytes: u64,

    pub active_generation: u64,

    /// Segment files on disk
    pub segments: usize,

    pub reclaimable_bytes: u64,
    pub compact_threshold: u64,
    pub compactions_completed: u64,
    pub compaction_state: CompactionState,
}
