//! KV section scanner
//!
//! Sequential decoding of entries between `kv_offset` and `kv_offset + kv_size`.
//! Keys are read; value bytes are skipped with a seek.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{BlfError, Result};
use crate::format::{EntryHeader, FileHeader, ENTRY_HEADER_SIZE};

use super::{EntryLocation, KeyEntry};

/// One decoded entry: where it lives and its key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedEntry {
    pub location: EntryLocation,
    pub key: Vec<u8>,
}

/// Iterator over the entries of a KV section, in file order
///
/// An entry whose prefix or body would run past the end of the section is
/// reported once as a `Format` error, after which the iterator is exhausted.
pub struct EntryScanner<'a, R> {
    storage: &'a mut R,
    /// Stop reading when we reach this offset (start of raw section)
    end_offset: u64,
    /// Offset of the next entry
    current_offset: u64,
    /// Whether the storage cursor sits at `current_offset`
    positioned: bool,
    done: bool,
}

impl<'a, R: Read + Seek> EntryScanner<'a, R> {
    pub fn new(storage: &'a mut R, header: &FileHeader) -> Self {
        Self {
            storage,
            end_offset: header.kv_end(),
            current_offset: header.kv_offset,
            positioned: false,
            done: false,
        }
    }

    fn read_entry(&mut self) -> Result<ScannedEntry> {
        if !self.positioned {
            self.storage.seek(SeekFrom::Start(self.current_offset))?;
            self.positioned = true;
        }

        let entry = read_prefix(&mut *self.storage, self.current_offset, self.end_offset)?;

        let mut key = vec![0u8; entry.key_len as usize];
        self.storage.read_exact(&mut key)?;

        // Skip the value
        if entry.value_len > 0 {
            self.storage
                .seek(SeekFrom::Current(entry.value_len as i64))?;
        }

        let location = EntryLocation {
            offset: self.current_offset,
            key_len: entry.key_len,
            value_len: entry.value_len,
        };
        self.current_offset = location.end();

        Ok(ScannedEntry { location, key })
    }
}

impl<'a, R: Read + Seek> Iterator for EntryScanner<'a, R> {
    type Item = Result<ScannedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.current_offset >= self.end_offset {
            return None;
        }

        let result = self.read_entry();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

/// Read the entry prefix at `offset`, checking it fits before `end`
///
/// The reader must already be positioned at `offset`.
pub(super) fn read_prefix<R: Read>(storage: &mut R, offset: u64, end: u64) -> Result<EntryHeader> {
    let remaining = end - offset;
    if remaining < ENTRY_HEADER_SIZE {
        return Err(BlfError::Format(format!(
            "Truncated entry prefix at offset {}: {} bytes left in KV section",
            offset, remaining
        )));
    }

    let mut prefix = [0u8; ENTRY_HEADER_SIZE as usize];
    storage.read_exact(&mut prefix)?;
    let entry = EntryHeader::decode(&prefix);

    if entry.entry_len() > remaining {
        return Err(BlfError::Format(format!(
            "Entry at offset {} claims {} bytes but only {} remain in KV section",
            offset,
            entry.entry_len(),
            remaining
        )));
    }

    Ok(entry)
}

/// Find the first entry whose key equals `key` byte for byte
pub fn find<R: Read + Seek>(
    storage: &mut R,
    header: &FileHeader,
    key: &[u8],
) -> Result<Option<EntryLocation>> {
    for scanned in EntryScanner::new(storage, header) {
        let scanned = scanned?;
        if scanned.key == key {
            return Ok(Some(scanned.location));
        }
    }
    Ok(None)
}

/// Lazy listing of `(key, value_len)` pairs; call `Session::list` again to restart
pub struct KeyIter<'a, R> {
    scanner: EntryScanner<'a, R>,
}

impl<'a, R: Read + Seek> KeyIter<'a, R> {
    pub(crate) fn new(storage: &'a mut R, header: &FileHeader) -> Self {
        Self {
            scanner: EntryScanner::new(storage, header),
        }
    }
}

impl<'a, R: Read + Seek> Iterator for KeyIter<'a, R> {
    type Item = Result<KeyEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.scanner.next().map(|scanned| {
            scanned.map(|s| KeyEntry {
                key: s.key,
                value_len: s.location.value_len,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::HEADER_SIZE;
    use std::io::Cursor;

    /// Build an in-memory file image from raw entries
    fn image(entries: &[(&str, &str)]) -> (Cursor<Vec<u8>>, FileHeader) {
        let mut section = Vec::new();
        for (key, value) in entries {
            let (key, value) = (key.as_bytes(), value.as_bytes());
            let prefix = EntryHeader::for_pair(key, value).unwrap();
            section.extend_from_slice(&prefix.encode());
            section.extend_from_slice(key);
            section.extend_from_slice(value);
        }
        let header = FileHeader::new().with_kv_size(section.len() as u64);
        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(&section);
        (Cursor::new(bytes), header)
    }

    #[test]
    fn test_scan_empty_section() {
        let (mut storage, header) = image(&[]);
        assert_eq!(EntryScanner::new(&mut storage, &header).count(), 0);
    }

    #[test]
    fn test_scan_reports_offsets_in_file_order() {
        let (mut storage, header) = image(&[("a", "xyz"), ("bb", "")]);
        let entries: Vec<_> = EntryScanner::new(&mut storage, &header)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, b"a");
        assert_eq!(entries[0].location.offset, HEADER_SIZE);
        assert_eq!(entries[0].location.value_len, 3);
        assert_eq!(entries[1].key, b"bb");
        assert_eq!(entries[1].location.offset, HEADER_SIZE + 8 + 1 + 3);
        assert_eq!(entries[1].location.end(), header.kv_end());
    }

    #[test]
    fn test_find_returns_first_duplicate() {
        let (mut storage, header) = image(&[("k", "one"), ("k", "second")]);
        let location = find(&mut storage, &header, b"k").unwrap().unwrap();
        assert_eq!(location.offset, HEADER_SIZE);
        assert_eq!(location.value_len, 3);
    }

    #[test]
    fn test_find_compares_exact_bytes() {
        let (mut storage, header) = image(&[("key1", "v")]);
        assert!(find(&mut storage, &header, b"key").unwrap().is_none());
        assert!(find(&mut storage, &header, b"key10").unwrap().is_none());
        assert!(find(&mut storage, &header, b"key1").unwrap().is_some());
    }

    #[test]
    fn test_overlong_entry_is_format_error() {
        let (mut storage, header) = image(&[("k", "value")]);
        // Shrink the section so the entry no longer fits
        let header = header.with_kv_size(header.kv_size - 2);

        let mut scanner = EntryScanner::new(&mut storage, &header);
        assert!(matches!(scanner.next(), Some(Err(BlfError::Format(_)))));
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_truncated_prefix_is_format_error() {
        let (mut storage, header) = image(&[("k", "v")]);
        let header = header.with_kv_size(header.kv_size + 4);
        storage.get_mut().extend_from_slice(&[0u8; 4]);

        let results: Vec<_> = EntryScanner::new(&mut storage, &header).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(BlfError::Format(_))));
    }
}
