//! Configuration for EmberKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{EmberError, Result};

/// Default reclaimable-byte threshold that triggers a merge (1 MiB)
pub const DEFAULT_COMPACT_THRESHOLD: u64 = 1024 * 1024;

/// Main configuration for an EmberKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the segment files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── 1.data
    ///     ├── 2.data
    ///     └── ...        (one file per generation)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Compaction Configuration
    // -------------------------------------------------------------------------
    /// Reclaimable bytes that must accumulate before a merge starts
    pub compact_threshold: u64,

    /// Run merges on a background thread when the threshold is crossed.
    /// When disabled, space is only reclaimed by `Engine::compact`.
    pub background_compaction: bool,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./emberkv_data"),
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            background_compaction: true,
            listen_addr: "127.0.0.1:9000".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.compact_threshold == 0 {
            return Err(EmberError::Config(
                "compact_threshold must be greater than zero".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(EmberError::Config(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the reclaimable-byte threshold (in bytes)
    pub fn compact_threshold(mut self, bytes: u64) -> Self {
        self.config.compact_threshold = bytes;
        self
    }

    /// Enable or disable the background compaction worker
    pub fn background_compaction(mut self, enabled: bool) -> Self {
        self.config.background_compaction = enabled;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
