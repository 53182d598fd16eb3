//! # EmberKV
//!
//! An embedded, log-structured key-value store with:
//! - Append-only segment files and an in-memory key directory
//! - Crash recovery by replaying segments in generation order
//! - Many concurrent readers, one writer at a time
//! - Background compaction that merges live entries into a new segment
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │                  (Multiple Clients)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                │
//! │          (RwLock: shared Get, exclusive Set/Remove)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────────┐
//!          │            │                     │
//!          ▼            ▼                     ▼
//!   ┌─────────────┐ ┌─────────────┐   ┌──────────────┐
//!   │   KeyDir    │ │  Segments   │◄──│  Compaction  │
//!   │ key → Loc   │ │ N.data ...  │   │   worker     │
//!   └─────────────┘ └─────────────┘   └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod segment;
pub mod keydir;
pub mod compaction;
pub mod network;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EmberError, Result};
pub use config::Config;
pub use engine::{Engine, EngineStats};
pub use compaction::{CompactionState, MergeReport};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
