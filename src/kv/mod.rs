//! KV Store Engine
//!
//! Key-value entries stored as a length-prefixed sequence in the KV section.
//!
//! ## Responsibilities
//! - Linear scan and first-match lookup (`scanner`)
//! - Append and same-length in-place update (`writer`)
//! - Delete by full rewrite into a staging file (`compaction`)
//! - Optional in-memory key index (`index`)
//!
//! ## Update Policy
//! ```text
//! put(key, value)
//!   ├── key absent              → append entry, shift raw blob forward
//!   ├── same value length       → overwrite value bytes in place
//!   └── different value length  → delete (rewrite), then append
//! ```
//!
//! Keys are unique only because `put` maintains it. A file written by another
//! tool may hold duplicates; lookups resolve to the first one in file order
//! and `delete` removes all of them.

pub(crate) mod compaction;
mod index;
mod scanner;
pub(crate) mod writer;

pub use index::KeyIndex;
pub use scanner::{find, EntryScanner, KeyIter, ScannedEntry};

use crate::format::ENTRY_HEADER_SIZE;

/// Position and shape of one entry inside the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLocation {
    /// Absolute file offset of the entry prefix
    pub offset: u64,
    pub key_len: u32,
    pub value_len: u32,
}

impl EntryLocation {
    /// Absolute file offset of the value bytes
    pub fn value_offset(&self) -> u64 {
        self.offset + ENTRY_HEADER_SIZE + self.key_len as u64
    }

    /// Absolute file offset just past this entry
    pub fn end(&self) -> u64 {
        self.value_offset() + self.value_len as u64
    }
}

/// A key as surfaced by `list()`: the key bytes and its value length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    pub key: Vec<u8>,
    pub value_len: u32,
}
