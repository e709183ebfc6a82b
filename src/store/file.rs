//! File-backed byte store
//!
//! A single data file. On unix every access is a positioned `pread`/`pwrite`,
//! so concurrent readers never wait on each other. Elsewhere a seek and the
//! read or write that follows it run under one mutex.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::config::SyncStrategy;
use crate::error::Result;

use super::ByteStore;

/// Byte store over a regular file
pub struct FileStore {
    /// Data file path (for logging and debugging)
    path: PathBuf,

    /// File handle
    file: File,

    /// Serialises growth, and seek+read/write pairs where there is no
    /// positioned I/O
    io_lock: Mutex<()>,

    /// When to fsync
    sync_strategy: SyncStrategy,
}

impl FileStore {
    /// Open the data file, creating it (empty) if it does not exist
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        debug!(path = %path.display(), length = file.metadata()?.len(), "opened data file");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            io_lock: Mutex::new(()),
            sync_strategy,
        })
    }

    /// Get the data file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sync_if_required(&self) -> Result<()> {
        if self.sync_strategy == SyncStrategy::EveryWrite {
            self.file.sync_data()?;
        }
        Ok(())
    }

    #[cfg(unix)]
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.read_exact_at(buf, offset)
    }

    #[cfg(unix)]
    fn write_all_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.write_all_at(data, offset)
    }

    #[cfg(not(unix))]
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        use std::io::{Read, Seek, SeekFrom};
        let _guard = self.io_lock.lock();
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }

    #[cfg(not(unix))]
    fn write_all_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let _guard = self.io_lock.lock();
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)
    }
}

impl ByteStore for FileStore {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.read_exact_at(offset, buf)?;
        Ok(())
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.write_all_at(offset, data)?;
        self.sync_if_required()
    }

    fn size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn set_len(&self, len: u64) -> Result<()> {
        let _guard = self.io_lock.lock();
        if len > self.file.metadata()?.len() {
            self.file.set_len(len)?;
            self.sync_if_required()?;
        }
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("sync_strategy", &self.sync_strategy)
            .finish()
    }
}
