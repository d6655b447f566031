//! Session Module
//!
//! The open-file handle that every engine operation goes through.
//!
//! ## Responsibilities
//! - Create, open and close the underlying file
//! - Own the authoritative in-memory header (and the optional key index)
//! - Route KV and raw operations to `kv` and `raw`
//! - Persist the header and flush before any mutation returns
//! - Reload state from disk when a multi-step mutation fails

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{Config, SyncStrategy};
use crate::error::{BlfError, Result};
use crate::format::{EntryHeader, FileHeader};
use crate::kv::{self, compaction, writer, EntryLocation, KeyIndex, KeyIter};
use crate::raw;

/// An open BLF file
///
/// ## Ownership
/// - `file`: `None` once closed; every operation then fails with `Closed`
/// - `header`: replaced wholesale after each mutation, never patched in place
/// - `path`: kept so delete can swap a rewritten file in by name
///
/// A session assumes it is the only writer of its file. Dropping it releases
/// the handle just like `close()`.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    file: Option<File>,
    header: FileHeader,
    config: Config,
    index: Option<KeyIndex>,
}

/// Summary of a file, as shown by `blf info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub header: FileHeader,
    /// Entries in the KV section (duplicates included)
    pub entry_count: usize,
    /// CRC32 of the raw blob (0 for an empty blob)
    pub raw_crc32: u32,
    /// Size of the file on disk
    pub file_size: u64,
}

impl Session {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create (or truncate) a file and write an empty header
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with_config(path, Config::default())
    }

    pub fn create_with_config(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| BlfError::Open {
                path: path.clone(),
                source,
            })?;

        let header = FileHeader::new();
        write_header(&mut file, &header, config.sync_strategy)?;

        let index = config.index_keys.then(KeyIndex::default);
        info!("Created BLF file {}", path.display());

        Ok(Self {
            path,
            file: Some(file),
            header,
            config,
            index,
        })
    }

    /// Open an existing file and validate its header
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, Config::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| BlfError::Open {
                path: path.clone(),
                source,
            })?;

        let header = FileHeader::load(&mut file)?;

        let file_size = file.metadata()?.len();
        if file_size < header.raw_end() {
            return Err(BlfError::Format(format!(
                "File is {} bytes but header describes {} bytes",
                file_size,
                header.raw_end()
            )));
        }

        let index = if config.index_keys {
            Some(KeyIndex::build(&mut file, &header)?)
        } else {
            None
        };

        info!(
            "Opened BLF file {} (kv_size={}, raw_size={})",
            path.display(),
            header.kv_size,
            header.raw_size
        );

        Ok(Self {
            path,
            file: Some(file),
            header,
            config,
            index,
        })
    }

    /// Release the file handle. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
            info!("Closed BLF file {}", self.path.display());
        }
        Ok(())
    }

    // =========================================================================
    // KV Operations
    // =========================================================================

    /// Store a value under `key`
    ///
    /// Same-length values are overwritten in place; a different length
    /// removes the old entry (full rewrite) and appends a new one.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        // Reject oversized fields before touching the file
        EntryHeader::for_pair(key, value)?;

        match self.find(key)? {
            Some(location) if location.value_len as usize == value.len() => {
                let strategy = self.config.sync_strategy;
                let file = open_file(&mut self.file)?;
                writer::overwrite_value(file, &location, value)?;
                sync(file, strategy)?;
                debug!(
                    "Updated {} value bytes in place at offset {}",
                    value.len(),
                    location.value_offset()
                );
                return Ok(());
            }
            Some(location) => {
                debug!(
                    "Value length changes {} -> {}, rewriting",
                    location.value_len,
                    value.len()
                );
                self.delete(key)?;
            }
            None => {}
        }

        self.append(key, value)
    }

    /// Copy the value of `key` into `buf`, returning its length
    ///
    /// Fails with `BufferTooSmall` (buffer untouched) when `buf` cannot hold
    /// the value, and `NotFound` when the key is absent.
    pub fn get(&mut self, key: &[u8], buf: &mut [u8]) -> Result<usize> {
        let location = self.find(key)?.ok_or(BlfError::NotFound)?;
        let len = location.value_len as usize;

        if buf.len() < len {
            return Err(BlfError::BufferTooSmall {
                required: len as u64,
            });
        }

        self.read_value(&location, &mut buf[..len])?;
        Ok(len)
    }

    /// Read the value of `key` into a new vector
    pub fn get_vec(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        let location = self.find(key)?.ok_or(BlfError::NotFound)?;
        let mut value = vec![0u8; location.value_len as usize];
        self.read_value(&location, &mut value)?;
        Ok(value)
    }

    pub fn contains_key(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.find(key)?.is_some())
    }

    /// Remove every entry stored under `key`
    ///
    /// The file is rebuilt in a staging file and renamed over the original.
    /// An absent key fails with `NotFound` and leaves the file untouched.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        if self.find(key)?.is_none() {
            return Err(BlfError::NotFound);
        }

        let file = open_file(&mut self.file)?;
        let staged = compaction::stage_without(file, &self.header, key, &self.path, &self.config)?;
        let new_header = staged.header;
        let (removed, kept) = (staged.removed, staged.kept);

        // No handle on the target may be open across the rename; on failure
        // `recover` reopens by path.
        self.file = None;

        match staged.commit(&self.path, &self.config) {
            Ok(file) => {
                self.file = Some(file);
                self.header = new_header;
                self.rebuild_index()?;
                info!(
                    "Rewrote {}: removed {} entr{}, kept {}",
                    self.path.display(),
                    removed,
                    if removed == 1 { "y" } else { "ies" },
                    kept
                );
                Ok(())
            }
            Err(e) => {
                warn!("Rewrite of {} failed: {}", self.path.display(), e);
                self.recover();
                Err(e)
            }
        }
    }

    /// Iterate over `(key, value_len)` in file order without reading values
    ///
    /// Each call starts a fresh scan from the beginning of the KV section.
    pub fn list(&mut self) -> Result<KeyIter<'_, File>> {
        let file = open_file(&mut self.file)?;
        Ok(KeyIter::new(file, &self.header))
    }

    /// Number of entries in the KV section (one scan)
    pub fn entry_count(&mut self) -> Result<usize> {
        let file = open_file(&mut self.file)?;
        let mut count = 0;
        for scanned in kv::EntryScanner::new(file, &self.header) {
            scanned?;
            count += 1;
        }
        Ok(count)
    }

    // =========================================================================
    // Raw Operations
    // =========================================================================

    /// Replace the raw blob with `data`
    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let strategy = self.config.sync_strategy;
        let file = open_file(&mut self.file)?;

        let result = raw::write_blob(file, &self.header, data).and_then(|updated| {
            sync(file, strategy)?;
            Ok(updated)
        });

        match result {
            Ok(updated) => {
                self.header = updated;
                debug!(
                    "Wrote {} raw bytes at offset {}",
                    data.len(),
                    updated.raw_offset
                );
                Ok(())
            }
            Err(e) => {
                self.recover();
                Err(e)
            }
        }
    }

    /// Copy the raw blob into `buf`, returning its length
    pub fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        let file = open_file(&mut self.file)?;
        raw::read_blob_into(file, &self.header, buf)
    }

    /// Read the raw blob into a new vector
    pub fn read_raw_vec(&mut self) -> Result<Vec<u8>> {
        let mut blob = vec![0u8; self.header.raw_size as usize];
        self.read_raw(&mut blob)?;
        Ok(blob)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Header, entry count and blob checksum
    pub fn info(&mut self) -> Result<FileInfo> {
        let entry_count = self.entry_count()?;
        let chunk_size = self.config.copy_buffer_size;
        let file = open_file(&mut self.file)?;

        Ok(FileInfo {
            header: self.header,
            entry_count,
            raw_crc32: raw::blob_crc32(file, &self.header, chunk_size)?,
            file_size: file.metadata()?.len(),
        })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Locate the first entry for `key`, via the index when enabled
    fn find(&mut self, key: &[u8]) -> Result<Option<EntryLocation>> {
        let file = open_file(&mut self.file)?;
        match &self.index {
            Some(index) => Ok(index.get(key)),
            None => kv::find(file, &self.header, key),
        }
    }

    /// Fill `buf` (exactly the value length) from the entry at `location`
    fn read_value(&mut self, location: &EntryLocation, buf: &mut [u8]) -> Result<()> {
        let file = open_file(&mut self.file)?;
        file.seek(SeekFrom::Start(location.value_offset()))?;
        file.read_exact(buf)?;
        Ok(())
    }

    /// Append a new entry (the key must be absent)
    fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let strategy = self.config.sync_strategy;
        let chunk_size = self.config.copy_buffer_size;
        let file = open_file(&mut self.file)?;
        let entry_offset = self.header.kv_end();

        let result = writer::append_entry(file, &self.header, key, value, chunk_size)
            .and_then(|updated| {
                write_header(file, &updated, strategy)?;
                Ok(updated)
            });

        match result {
            Ok(updated) => {
                self.header = updated;
                if let Some(index) = self.index.as_mut() {
                    index.insert(
                        key.to_vec(),
                        EntryLocation {
                            offset: entry_offset,
                            key_len: key.len() as u32,
                            value_len: value.len() as u32,
                        },
                    );
                }
                debug!(
                    "Appended entry at offset {} (kv_size={})",
                    entry_offset, updated.kv_size
                );
                Ok(())
            }
            Err(e) => {
                self.recover();
                Err(e)
            }
        }
    }

    /// Rebuild the key index from the current header
    ///
    /// On failure the stale index is dropped and the session is closed, so no
    /// later lookup can act on offsets from before the last rewrite.
    fn rebuild_index(&mut self) -> Result<()> {
        if !self.config.index_keys {
            return Ok(());
        }

        let file = open_file(&mut self.file)?;
        match KeyIndex::build(file, &self.header) {
            Ok(index) => {
                self.index = Some(index);
                Ok(())
            }
            Err(e) => {
                warn!(
                    "Cannot rebuild key index of {}, closing: {}",
                    self.path.display(),
                    e
                );
                self.invalidate();
                Err(e)
            }
        }
    }

    /// Drop the handle and any cached locations
    fn invalidate(&mut self) {
        self.file = None;
        self.index = None;
    }

    /// Re-sync in-memory state with the file after a failed mutation
    ///
    /// Reopens the file by path if the handle was released, then reloads the
    /// header and index. If even that fails the session is closed.
    fn recover(&mut self) {
        if self.file.is_none() {
            match OpenOptions::new().read(true).write(true).open(&self.path) {
                Ok(file) => self.file = Some(file),
                Err(e) => {
                    warn!("Cannot reopen {}: {}", self.path.display(), e);
                    self.invalidate();
                    return;
                }
            }
        }

        let Some(file) = self.file.as_mut() else {
            return;
        };

        match FileHeader::load(file) {
            Ok(header) => {
                self.header = header;
                if self.rebuild_index().is_err() {
                    return;
                }
                warn!("Reloaded header of {} after failed write", self.path.display());
            }
            Err(e) => {
                warn!(
                    "Header of {} unreadable after failed write, closing: {}",
                    self.path.display(),
                    e
                );
                self.invalidate();
            }
        }
    }
}

fn open_file(file: &mut Option<File>) -> Result<&mut File> {
    file.as_mut().ok_or(BlfError::Closed)
}

/// Persist the header, then flush everything according to `strategy`
fn write_header(file: &mut File, header: &FileHeader, strategy: SyncStrategy) -> Result<()> {
    header.persist(file)?;
    sync(file, strategy)
}

fn sync(file: &mut File, strategy: SyncStrategy) -> Result<()> {
    match strategy {
        SyncStrategy::Flush => file.flush()?,
        SyncStrategy::SyncAll => file.sync_all()?,
    }
    Ok(())
}
