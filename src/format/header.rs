//! File Header
//!
//! Fixed 40-byte header at offset 0: identifies the format and records where
//! the KV and raw sections live.

use std::io::{Read, Seek, SeekFrom, Write};

use bytes::{Buf, BufMut};

use crate::error::{BlfError, Result};

use super::{HEADER_SIZE, MAGIC, VERSION};

/// In-memory copy of the file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u32,
    /// Start of the KV section (always `HEADER_SIZE`)
    pub kv_offset: u64,
    /// Length of the KV section in bytes
    pub kv_size: u64,
    /// Start of the raw section (always `kv_offset + kv_size`)
    pub raw_offset: u64,
    /// Length of the raw blob in bytes
    pub raw_size: u64,
}

impl FileHeader {
    /// Header for a freshly created, empty file
    pub fn new() -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            kv_offset: HEADER_SIZE,
            kv_size: 0,
            raw_offset: HEADER_SIZE,
            raw_size: 0,
        }
    }

    /// End of the KV section (exclusive)
    pub fn kv_end(&self) -> u64 {
        self.kv_offset + self.kv_size
    }

    /// End of the raw section, which is also the logical end of the file
    pub fn raw_end(&self) -> u64 {
        self.raw_offset + self.raw_size
    }

    /// Copy of this header with a different KV section size.
    /// The raw section is re-anchored right after the KV section.
    pub fn with_kv_size(&self, kv_size: u64) -> Self {
        Self {
            kv_size,
            raw_offset: self.kv_offset + kv_size,
            ..*self
        }
    }

    /// Copy of this header with a different raw blob size
    pub fn with_raw_size(&self, raw_size: u64) -> Self {
        Self { raw_size, ..*self }
    }

    /// Check magic, version and section layout
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(BlfError::Format(format!(
                "Invalid magic: expected {:#010X}, got {:#010X}",
                MAGIC, self.magic
            )));
        }

        if self.version != VERSION {
            return Err(BlfError::Format(format!(
                "Unsupported format version: {}",
                self.version
            )));
        }

        if self.kv_offset != HEADER_SIZE {
            return Err(BlfError::Format(format!(
                "KV section must start at {}, header says {}",
                HEADER_SIZE, self.kv_offset
            )));
        }

        let kv_end = self
            .kv_offset
            .checked_add(self.kv_size)
            .ok_or_else(|| BlfError::format("KV section size overflows"))?;

        if self.raw_offset != kv_end {
            return Err(BlfError::Format(format!(
                "Raw section must start at {} (end of KV section), header says {}",
                kv_end, self.raw_offset
            )));
        }

        if self.raw_offset.checked_add(self.raw_size).is_none() {
            return Err(BlfError::format("Raw section size overflows"));
        }

        Ok(())
    }

    /// Serialize to the 40-byte on-disk image
    pub fn encode(&self) -> [u8; HEADER_SIZE as usize] {
        let mut image = [0u8; HEADER_SIZE as usize];
        let mut buf = &mut image[..];
        buf.put_u32_ne(self.magic);
        buf.put_u32_ne(self.version);
        buf.put_u64_ne(self.kv_offset);
        buf.put_u64_ne(self.kv_size);
        buf.put_u64_ne(self.raw_offset);
        buf.put_u64_ne(self.raw_size);
        image
    }

    /// Parse the 40-byte on-disk image (no validation)
    pub fn decode(image: &[u8; HEADER_SIZE as usize]) -> Self {
        let mut buf = &image[..];
        Self {
            magic: buf.get_u32_ne(),
            version: buf.get_u32_ne(),
            kv_offset: buf.get_u64_ne(),
            kv_size: buf.get_u64_ne(),
            raw_offset: buf.get_u64_ne(),
            raw_size: buf.get_u64_ne(),
        }
    }

    /// Write the header over the first 40 bytes of `storage`
    pub fn persist<W: Write + Seek>(&self, storage: &mut W) -> Result<()> {
        storage.seek(SeekFrom::Start(0))?;
        storage.write_all(&self.encode())?;
        Ok(())
    }

    /// Read and validate the header at the start of `storage`
    ///
    /// A short read surfaces as `Io`; a bad image as `Format`.
    pub fn load<R: Read + Seek>(storage: &mut R) -> Result<Self> {
        storage.seek(SeekFrom::Start(0))?;
        let mut image = [0u8; HEADER_SIZE as usize];
        storage.read_exact(&mut image)?;

        let header = Self::decode(&image);
        header.validate()?;
        Ok(header)
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_new_header_is_valid() {
        let header = FileHeader::new();
        assert_eq!(header.kv_offset, HEADER_SIZE);
        assert_eq!(header.raw_offset, HEADER_SIZE);
        assert_eq!(header.kv_size, 0);
        assert_eq!(header.raw_size, 0);
        header.validate().unwrap();
    }

    #[test]
    fn test_image_layout_matches_field_offsets() {
        let header = FileHeader::new().with_kv_size(17).with_raw_size(5);
        let image = header.encode();

        assert_eq!(&image[0..4], &MAGIC.to_ne_bytes());
        assert_eq!(&image[4..8], &VERSION.to_ne_bytes());
        assert_eq!(&image[8..16], &HEADER_SIZE.to_ne_bytes());
        assert_eq!(&image[16..24], &17u64.to_ne_bytes());
        assert_eq!(&image[24..32], &(HEADER_SIZE + 17).to_ne_bytes());
        assert_eq!(&image[32..40], &5u64.to_ne_bytes());
        assert_eq!(FileHeader::decode(&image), header);
    }

    #[test]
    fn test_with_kv_size_reanchors_raw_section() {
        let header = FileHeader::new().with_raw_size(3).with_kv_size(100);
        assert_eq!(header.raw_offset, header.kv_offset + 100);
        assert_eq!(header.raw_size, 3);
        assert_eq!(header.raw_end(), HEADER_SIZE + 103);
    }

    #[test]
    fn test_validate_rejects_bad_magic() {
        let header = FileHeader {
            magic: 0xDEAD_BEEF,
            ..FileHeader::new()
        };
        assert!(matches!(header.validate(), Err(BlfError::Format(_))));
    }

    #[test]
    fn test_validate_rejects_bad_version() {
        let header = FileHeader {
            version: VERSION + 1,
            ..FileHeader::new()
        };
        assert!(matches!(header.validate(), Err(BlfError::Format(_))));
    }

    #[test]
    fn test_validate_rejects_detached_raw_section() {
        let header = FileHeader {
            raw_offset: HEADER_SIZE + 8,
            ..FileHeader::new()
        };
        assert!(matches!(header.validate(), Err(BlfError::Format(_))));
    }

    #[test]
    fn test_validate_rejects_overflowing_sizes() {
        let header = FileHeader {
            kv_size: u64::MAX,
            ..FileHeader::new()
        };
        assert!(matches!(header.validate(), Err(BlfError::Format(_))));
    }

    #[test]
    fn test_persist_then_load() {
        let mut storage = Cursor::new(Vec::new());
        let header = FileHeader::new().with_kv_size(24).with_raw_size(7);

        header.persist(&mut storage).unwrap();
        assert_eq!(storage.get_ref().len(), HEADER_SIZE as usize);

        let loaded = FileHeader::load(&mut storage).unwrap();
        assert_eq!(loaded, header);
    }

    #[test]
    fn test_persist_overwrites_only_the_prefix() {
        let mut storage = Cursor::new(vec![0xAAu8; 64]);
        FileHeader::new().persist(&mut storage).unwrap();

        let bytes = storage.into_inner();
        assert_eq!(bytes.len(), 64);
        assert!(bytes[40..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_load_short_read_is_io_error() {
        let mut storage = Cursor::new(vec![0u8; 12]);
        assert!(matches!(
            FileHeader::load(&mut storage),
            Err(BlfError::Io(_))
        ));
    }
}
