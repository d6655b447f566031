//! Delete by rewrite
//!
//! Removing an entry shrinks the KV section, so the whole file is rebuilt:
//!
//! 1. Create a staging file next to the target (same filesystem)
//! 2. Write a header placeholder (`kv_size = 0`, original `raw_size`)
//! 3. Re-emit every entry whose key differs from the one being removed
//! 4. Copy the raw blob to the new `raw_offset`
//! 5. Rewrite the header, fsync the staging file
//! 6. Rename the staging file over the target
//!
//! Steps 1-5 never touch the original file, so a failure there leaves it
//! intact. The staging file is removed on drop unless it was committed.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::config::{Config, SyncStrategy};
use crate::error::{BlfError, Result};
use crate::format::FileHeader;

use super::scanner::read_prefix;

/// A fully written replacement file, not yet swapped in
pub(crate) struct StagedRewrite {
    staging: NamedTempFile,
    /// Header of the rewritten file
    pub header: FileHeader,
    /// Number of entries dropped (duplicates of the key count individually)
    pub removed: usize,
    /// Number of entries carried over
    pub kept: usize,
}

/// Write a copy of the file without any entry whose key equals `key`
pub(crate) fn stage_without<S: Read + Seek>(
    storage: &mut S,
    header: &FileHeader,
    key: &[u8],
    target: &Path,
    config: &Config,
) -> Result<StagedRewrite> {
    let mut staging = NamedTempFile::new_in(staging_dir(target))?;
    // Keep the target's permissions once the staging file is renamed over it
    fs::set_permissions(staging.path(), fs::metadata(target)?.permissions())?;

    let (new_header, removed, kept) = {
        let mut reader = BufReader::with_capacity(config.copy_buffer_size, &mut *storage);
        let mut writer = BufWriter::with_capacity(config.copy_buffer_size, &mut staging);

        writer.write_all(&header.with_kv_size(0).encode())?;

        // Step 3: entries
        reader.seek(SeekFrom::Start(header.kv_offset))?;
        let end = header.kv_end();
        let mut offset = header.kv_offset;
        let mut kv_size = 0u64;
        let mut removed = 0usize;
        let mut kept = 0usize;

        while offset < end {
            let entry = read_prefix(&mut reader, offset, end)?;

            let mut entry_key = vec![0u8; entry.key_len as usize];
            reader.read_exact(&mut entry_key)?;

            if entry_key == key {
                reader.seek_relative(entry.value_len as i64)?;
                removed += 1;
            } else {
                writer.write_all(&entry.encode())?;
                writer.write_all(&entry_key)?;
                copy_exact(&mut reader, &mut writer, entry.value_len as u64)?;
                kv_size += entry.entry_len();
                kept += 1;
            }

            offset += entry.entry_len();
        }

        // Step 4: raw blob
        let new_header = header.with_kv_size(kv_size);
        if header.raw_size > 0 {
            reader.seek(SeekFrom::Start(header.raw_offset))?;
            copy_exact(&mut reader, &mut writer, header.raw_size)?;
        }

        // Step 5: final header
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&new_header.encode())?;
        writer.flush()?;

        (new_header, removed, kept)
    };

    staging.as_file().sync_all()?;

    Ok(StagedRewrite {
        staging,
        header: new_header,
        removed,
        kept,
    })
}

impl StagedRewrite {
    /// Atomically replace `target` with the staged file
    ///
    /// Returns the open handle of the new file. The caller must have released
    /// its own handle on `target` beforehand.
    pub fn commit(self, target: &Path, config: &Config) -> Result<File> {
        let file = self
            .staging
            .persist(target)
            .map_err(|e| BlfError::Io(e.error))?;

        if config.sync_strategy == SyncStrategy::SyncAll {
            sync_directory(staging_dir(target))?;
        }

        Ok(file)
    }
}

/// Directory holding `target`; the staging file must live on the same filesystem
fn staging_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Copy exactly `len` bytes, failing on a short source
fn copy_exact<R: Read, W: Write>(reader: &mut R, writer: &mut W, len: u64) -> Result<()> {
    let copied = io::copy(&mut reader.take(len), writer)?;
    if copied != len {
        return Err(BlfError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, source ended after {}", len, copied),
        )));
    }
    Ok(())
}

/// Make the rename durable
#[cfg(unix)]
fn sync_directory(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

/// No directory fsync on this platform
#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> Result<()> {
    Ok(())
}
