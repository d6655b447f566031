//! KV section writes
//!
//! Append and same-length overwrite. Neither persists the header; the session
//! does that once the data is in place.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::Result;
use crate::format::{EntryHeader, FileHeader};

use super::EntryLocation;

/// Overwrite the value bytes of an existing entry (lengths must match)
pub fn overwrite_value<W: Write + Seek>(
    storage: &mut W,
    location: &EntryLocation,
    value: &[u8],
) -> Result<()> {
    debug_assert_eq!(location.value_len as usize, value.len());

    storage.seek(SeekFrom::Start(location.value_offset()))?;
    storage.write_all(value)?;
    Ok(())
}

/// Append an entry at the end of the KV section
///
/// The raw blob sits right after the KV section, so it is first moved forward
/// by the entry length. Returns the header describing the new layout; the
/// new entry starts at the old `kv_end()`.
pub fn append_entry<S: Read + Write + Seek>(
    storage: &mut S,
    header: &FileHeader,
    key: &[u8],
    value: &[u8],
    chunk_size: usize,
) -> Result<FileHeader> {
    let prefix = EntryHeader::for_pair(key, value)?;
    let entry_len = prefix.entry_len();

    if header.raw_size > 0 {
        shift_forward(
            storage,
            header.raw_offset,
            header.raw_size,
            entry_len,
            chunk_size,
        )?;
    }

    let mut entry = Vec::with_capacity(entry_len as usize);
    entry.extend_from_slice(&prefix.encode());
    entry.extend_from_slice(key);
    entry.extend_from_slice(value);

    storage.seek(SeekFrom::Start(header.kv_end()))?;
    storage.write_all(&entry)?;

    Ok(header.with_kv_size(header.kv_size + entry_len))
}

/// Move `len` bytes at `start` forward by `distance` bytes
///
/// Copies back to front so overlapping ranges are safe.
pub(crate) fn shift_forward<S: Read + Write + Seek>(
    storage: &mut S,
    start: u64,
    len: u64,
    distance: u64,
    chunk_size: usize,
) -> Result<()> {
    if len == 0 || distance == 0 {
        return Ok(());
    }

    let mut buf = vec![0u8; (chunk_size.max(1) as u64).min(len) as usize];
    let mut remaining = len;

    while remaining > 0 {
        let n = remaining.min(buf.len() as u64);
        let src = start + remaining - n;
        let chunk = &mut buf[..n as usize];

        storage.seek(SeekFrom::Start(src))?;
        storage.read_exact(chunk)?;
        storage.seek(SeekFrom::Start(src + distance))?;
        storage.write_all(chunk)?;

        remaining -= n;
    }

    Ok(())
}
