//! Raw Blob Store
//!
//! The single opaque blob stored after the KV section. Writes always replace
//! the whole blob; there is no append and no history.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{BlfError, Result};
use crate::format::FileHeader;

/// Replace the blob with `data` and persist the new header
///
/// The file is cut at the new end once the header points there, so a shorter
/// blob leaves no stale tail. The caller flushes.
pub fn write_blob(file: &mut File, header: &FileHeader, data: &[u8]) -> Result<FileHeader> {
    file.seek(SeekFrom::Start(header.raw_offset))?;
    file.write_all(data)?;

    let updated = header.with_raw_size(data.len() as u64);
    updated.persist(file)?;
    file.set_len(updated.raw_end())?;

    Ok(updated)
}

/// Copy the blob into `buf`, returning the number of bytes read
///
/// `buf` is left untouched when it is smaller than the blob.
pub fn read_blob_into(file: &mut File, header: &FileHeader, buf: &mut [u8]) -> Result<usize> {
    if (buf.len() as u64) < header.raw_size {
        return Err(BlfError::BufferTooSmall {
            required: header.raw_size,
        });
    }

    if header.raw_size == 0 {
        return Ok(0);
    }

    let len = header.raw_size as usize;
    file.seek(SeekFrom::Start(header.raw_offset))?;
    file.read_exact(&mut buf[..len])?;
    Ok(len)
}

/// CRC32 of the blob, streamed in `chunk_size` pieces
pub fn blob_crc32(file: &mut File, header: &FileHeader, chunk_size: usize) -> Result<u32> {
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0u8; (chunk_size.max(1) as u64).min(header.raw_size.max(1)) as usize];
    let mut remaining = header.raw_size;

    file.seek(SeekFrom::Start(header.raw_offset))?;
    while remaining > 0 {
        let n = remaining.min(buf.len() as u64) as usize;
        file.read_exact(&mut buf[..n])?;
        hasher.update(&buf[..n]);
        remaining -= n as u64;
    }

    Ok(hasher.finalize())
}
