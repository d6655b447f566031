//! Error types for BLF
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using BlfError
pub type Result<T> = std::result::Result<T, BlfError>;

/// Unified error type for BLF operations
#[derive(Debug, Error)]
pub enum BlfError {
    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    /// The file could not be created or opened for read/write
    #[error("Cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    /// Bad magic/version, inconsistent section layout, or a corrupt entry
    #[error("Format error: {0}")]
    Format(String),

    #[error("Entry field too large: {len} bytes (max {})", u32::MAX)]
    EntryTooLarge { len: usize },

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    NotFound,

    /// Caller buffer cannot hold the value; `required` is the exact size needed
    #[error("Buffer too small: {required} bytes required")]
    BufferTooSmall { required: u64 },
}

impl BlfError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        BlfError::Format(msg.into())
    }
}
