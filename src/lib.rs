//! # BLF
//!
//! A single-file binary container holding:
//! - An ordered collection of key-value entries (byte keys → byte values)
//! - One raw byte blob of arbitrary size
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Session                               │
//! │          (file handle + header cache + path)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  KV Engine  │          │  Raw Blob   │
//!   │ (scan/put/  │          │ (replace    │
//!   │  rewrite)   │          │  whole)     │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                         │
//!          └────────────┬────────────┘
//!                       ▼
//!               ┌─────────────┐
//!               │   Format    │
//!               │  (header,   │
//!               │   entries)  │
//!               └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use blf::Session;
//!
//! let mut session = Session::create("asset.blf")?;
//! session.put(b"name", b"Test File")?;
//! session.write_raw(b"payload")?;
//! assert_eq!(session.get_vec(b"name")?, b"Test File");
//! session.close()?;
//! # Ok::<(), blf::BlfError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod format;
pub mod kv;
pub mod raw;
pub mod session;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, SyncStrategy};
pub use error::{BlfError, Result};
pub use format::FileHeader;
pub use kv::KeyEntry;
pub use session::{FileInfo, Session};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the blf crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
