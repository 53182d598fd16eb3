//! Merge procedure
//!
//! Copies every live entry into a new segment and deletes the old ones.

use std::fs;
use std::path::Path;

use parking_lot::RwLock;

use crate::engine::EngineState;
use crate::error::{EmberError, Result};
use crate::keydir::Location;
use crate::segment::{SegmentReader, SegmentWriter};

/// Entries copied between two relocation passes
const RELOCATE_BATCH: usize = 64;

/// Outcome of one merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Generation holding the compacted entries
    pub merge_generation: u64,

    /// Generation receiving foreground writes from now on
    pub active_generation: u64,

    /// Keys now served from the merge segment
    pub keys_relocated: u64,

    /// Snapshot keys overwritten or removed while the merge ran
    pub keys_skipped: u64,

    /// Bytes written to the merge segment
    pub bytes_written: u64,

    /// Bytes in the merge segment that no key points at
    pub stale_bytes: u64,

    /// Old generations deleted
    pub segments_removed: usize,
}

/// Run one merge over the engine state
///
/// Steps:
/// 1. Under the write lock: allocate merge and active generations, swap in
///    the new active writer, snapshot the KeyDir
/// 2. For each snapshot entry: copy its raw bytes under the read lock
/// 3. Per batch: flush, then relocate under the write lock only where the
///    key still points at its snapshot Location. Other copies stay behind
///    as stale bytes
/// 4. Close and delete every generation older than the merge segment
///
/// An error in step 1 leaves the engine state untouched. An error before
/// step 4 leaves every old segment in place.
pub(crate) fn merge(dir: &Path, state: &RwLock<EngineState>) -> Result<MergeReport> {
    // Step 1: swap the active writer and take a snapshot
    let (mut merge_writer, active_generation, snapshot) = {
        let mut state = state.write();
        let merge_generation = state.generation + 1;
        let active_generation = state.generation + 2;
        // Reserved even if a handle below fails, so a retry never collides
        // with a file left behind
        state.generation = active_generation;

        let merge_writer = SegmentWriter::create(dir, merge_generation)?;
        let merge_reader = SegmentReader::open(dir, merge_generation)?;
        let active_writer = SegmentWriter::create(dir, active_generation)?;
        let active_reader = SegmentReader::open(dir, active_generation)?;
        state.writer.flush()?;

        // Nothing below can fail
        state.readers.insert(merge_generation, merge_reader);
        state.readers.insert(active_generation, active_reader);
        drop(std::mem::replace(&mut state.writer, active_writer));

        (merge_writer, active_generation, state.keydir.snapshot())
    };

    let merge_generation = merge_writer.generation();
    let mut report = MergeReport {
        merge_generation,
        active_generation,
        ..MergeReport::default()
    };

    tracing::debug!(
        merge_generation,
        active_generation,
        keys = snapshot.len(),
        "Merge started"
    );

    // Steps 2 & 3: copy and relocate in batches
    for batch in snapshot.chunks(RELOCATE_BATCH) {
        let mut copied: Vec<(&[u8], Location, Location)> = Vec::with_capacity(batch.len());

        for (key, old) in batch {
            // Copied even if the key has moved on: a later tombstone needs a
            // Set before it on disk, and relocate() discards the stale copy
            let raw = {
                let state = state.read();
                let reader = state
                    .readers
                    .get(&old.generation)
                    .ok_or(EmberError::MissingSegment {
                        generation: old.generation,
                    })?;
                reader.read_raw(old.offset, old.length)?
            };

            let (offset, length) = merge_writer.append_raw(&raw)?;
            report.bytes_written += length;
            copied.push((
                key.as_slice(),
                *old,
                Location::new(merge_generation, offset, length),
            ));
        }

        merge_writer.flush()?;

        let mut state = state.write();
        for (key, old, new) in copied {
            if state.keydir.relocate(key, old, new) {
                report.keys_relocated += 1;
            } else {
                report.keys_skipped += 1;
                report.stale_bytes += new.length;
            }
        }
    }

    merge_writer.close()?;

    // Step 4: retire everything older than the merge segment
    let retired: Vec<SegmentReader> = {
        let mut state = state.write();
        let generations: Vec<u64> = state
            .readers
            .range(..merge_generation)
            .map(|(generation, _)| *generation)
            .collect();
        generations
            .iter()
            .filter_map(|generation| state.readers.remove(generation))
            .collect()
    };

    for reader in retired {
        let path = reader.path().to_path_buf();
        drop(reader);
        fs::remove_file(&path)?;
        report.segments_removed += 1;
    }

    Ok(report)
}
