//! Configuration for BLF sessions
//!
//! Centralized configuration with sensible defaults.

/// Session configuration
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// How mutating operations push data to disk before returning
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Lookup Configuration
    // -------------------------------------------------------------------------
    /// Keep an in-memory key → entry index (rebuilt on open by one scan).
    /// The on-disk format is identical either way.
    pub index_keys: bool,

    // -------------------------------------------------------------------------
    // I/O Configuration
    // -------------------------------------------------------------------------
    /// Chunk size used when moving or copying the raw blob (in bytes)
    pub copy_buffer_size: usize,
}

/// Flush strategy applied at the end of every mutating operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Push writes to the OS (`File::flush`) only
    Flush,

    /// fsync data and metadata (`File::sync_all`)
    SyncAll,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_strategy: SyncStrategy::SyncAll,
            index_keys: false,
            copy_buffer_size: 64 * 1024, // 64 KB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Enable or disable the in-memory key index
    pub fn index_keys(mut self, enabled: bool) -> Self {
        self.config.index_keys = enabled;
        self
    }

    /// Set the copy chunk size (in bytes, clamped to at least 1)
    pub fn copy_buffer_size(mut self, size: usize) -> Self {
        self.config.copy_buffer_size = size.max(1);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
