//! KV entry prefix
//!
//! Each entry is `[KeyLen: u32][ValLen: u32][Key][Value]`, densely packed.

use bytes::{Buf, BufMut};

use crate::error::{BlfError, Result};

use super::ENTRY_HEADER_SIZE;

/// Length prefix written before every key/value pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub key_len: u32,
    pub value_len: u32,
}

impl EntryHeader {
    /// Build the prefix for a key/value pair, rejecting fields over `u32::MAX`
    pub fn for_pair(key: &[u8], value: &[u8]) -> Result<Self> {
        Ok(Self {
            key_len: field_len(key)?,
            value_len: field_len(value)?,
        })
    }

    /// Total encoded size of the entry: prefix + key + value
    pub fn entry_len(&self) -> u64 {
        ENTRY_HEADER_SIZE + self.key_len as u64 + self.value_len as u64
    }

    /// Offset of the value bytes relative to the entry start
    pub fn value_offset(&self) -> u64 {
        ENTRY_HEADER_SIZE + self.key_len as u64
    }

    pub fn encode(&self) -> [u8; ENTRY_HEADER_SIZE as usize] {
        let mut image = [0u8; ENTRY_HEADER_SIZE as usize];
        let mut buf = &mut image[..];
        buf.put_u32_ne(self.key_len);
        buf.put_u32_ne(self.value_len);
        image
    }

    pub fn decode(image: &[u8; ENTRY_HEADER_SIZE as usize]) -> Self {
        let mut buf = &image[..];
        Self {
            key_len: buf.get_u32_ne(),
            value_len: buf.get_u32_ne(),
        }
    }
}

fn field_len(field: &[u8]) -> Result<u32> {
    u32::try_from(field.len()).map_err(|_| BlfError::EntryTooLarge { len: field.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_len_counts_prefix_key_and_value() {
        let header = EntryHeader::for_pair(b"name", b"Test File").unwrap();
        assert_eq!(header.key_len, 4);
        assert_eq!(header.value_len, 9);
        assert_eq!(header.entry_len(), 8 + 4 + 9);
        assert_eq!(header.value_offset(), 12);
    }

    #[test]
    fn test_empty_key_and_value() {
        let header = EntryHeader::for_pair(b"", b"").unwrap();
        assert_eq!(header.entry_len(), ENTRY_HEADER_SIZE);
    }

    #[test]
    fn test_encode_is_native_endian() {
        let header = EntryHeader {
            key_len: 3,
            value_len: 0x0102_0304,
        };
        let image = header.encode();
        assert_eq!(&image[0..4], &3u32.to_ne_bytes());
        assert_eq!(&image[4..8], &0x0102_0304u32.to_ne_bytes());
        assert_eq!(EntryHeader::decode(&image), header);
    }
}
