//! Format Module
//!
//! On-disk layout of a BLF file.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (40 bytes, native endian)                        │
//! │   Magic: u32 | Version: u32                             │
//! │   KvOffset: u64 | KvSize: u64                           │
//! │   RawOffset: u64 | RawSize: u64                         │
//! ├─────────────────────────────────────────────────────────┤
//! │ KV Section (KvSize bytes, starts at KvOffset)           │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                │
//! │   ... repeated, no count, no padding ...                │
//! ├─────────────────────────────────────────────────────────┤
//! │ Raw Section (RawSize bytes, starts at RawOffset)        │
//! │   single opaque blob                                    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! `RawOffset == KvOffset + KvSize` always holds: the sections are contiguous.

mod entry;
mod header;

pub use entry::EntryHeader;
pub use header::FileHeader;

// =============================================================================
// Shared Constants (used by header, kv and raw)
// =============================================================================

/// Magic number identifying a BLF file ('BLF\0')
pub const MAGIC: u32 = 0x42B1_F000;

/// Current format version
pub const VERSION: u32 = 1;

/// Header size: Magic (4) + Version (4) + 4 × u64 (32) = 40 bytes
pub const HEADER_SIZE: u64 = 40;

/// Entry prefix size: KeyLen (4) + ValLen (4) = 8 bytes
pub const ENTRY_HEADER_SIZE: u64 = 8;
