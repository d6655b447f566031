//! In-memory key index
//!
//! Ordered map from key to the location of its first entry. Built by one scan
//! of the KV section and kept in step by the session; nothing is stored on disk.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use crate::error::Result;
use crate::format::FileHeader;

use super::{EntryLocation, EntryScanner};

/// Key → first entry location
#[derive(Debug, Default)]
pub struct KeyIndex {
    entries: BTreeMap<Vec<u8>, EntryLocation>,
}

impl KeyIndex {
    /// Build the index from the KV section. Later duplicates are ignored so
    /// the index agrees with a linear first-match scan.
    pub fn build<R: Read + Seek>(storage: &mut R, header: &FileHeader) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for scanned in EntryScanner::new(storage, header) {
            let scanned = scanned?;
            entries.entry(scanned.key).or_insert(scanned.location);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &[u8]) -> Option<EntryLocation> {
        self.entries.get(key).copied()
    }

    /// Record a freshly appended entry (the key must not already be indexed)
    pub fn insert(&mut self, key: Vec<u8>, location: EntryLocation) {
        let previous = self.entries.insert(key, location);
        debug_assert!(previous.is_none());
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{EntryHeader, HEADER_SIZE};
    use std::io::Cursor;

    fn image(entries: &[(&str, &str)]) -> (Cursor<Vec<u8>>, FileHeader) {
        let mut section = Vec::new();
        for (key, value) in entries {
            let prefix = EntryHeader::for_pair(key.as_bytes(), value.as_bytes()).unwrap();
            section.extend_from_slice(&prefix.encode());
            section.extend_from_slice(key.as_bytes());
            section.extend_from_slice(value.as_bytes());
        }
        let header = FileHeader::new().with_kv_size(section.len() as u64);
        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(&section);
        (Cursor::new(bytes), header)
    }

    #[test]
    fn test_build_keeps_first_duplicate() {
        let (mut storage, header) = image(&[("a", "1"), ("b", "22"), ("a", "333")]);
        let index = KeyIndex::build(&mut storage, &header).unwrap();

        assert_eq!(index.len(), 2);
        let a = index.get(b"a").unwrap();
        assert_eq!(a.offset, HEADER_SIZE);
        assert_eq!(a.value_len, 1);
        assert!(index.get(b"c").is_none());
    }

    #[test]
    fn test_insert_new_key() {
        let (mut storage, header) = image(&[]);
        let mut index = KeyIndex::build(&mut storage, &header).unwrap();
        assert!(index.is_empty());

        let location = EntryLocation {
            offset: HEADER_SIZE,
            key_len: 1,
            value_len: 4,
        };
        index.insert(b"k".to_vec(), location);

        assert_eq!(index.get(b"k"), Some(location));
    }
}
