//! Block store for fixed-size block I/O on the index file.

use lindex_common::layout::is_aligned;
use lindex_common::{BlockOffset, LindexError, Result, StoreConfig};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Random-access block I/O over a single index file.
///
/// Every read and write moves exactly one block. Offsets are byte positions
/// that must sit on the block grid; block 0 holds the metadata header and
/// blocks 1..N hold tree nodes. Writes are flushed before returning when
/// fsync is enabled, so each operation is durable at return.
pub struct BlockStore {
    /// Configuration (block size, fsync).
    config: StoreConfig,
    /// Path to the index file.
    path: PathBuf,
    /// Open file handle and cached length.
    inner: Mutex<FileHandle>,
}

/// Handle for the open index file.
struct FileHandle {
    /// The file handle.
    file: File,
    /// Current file length in bytes.
    len: u64,
}

impl BlockStore {
    /// Creates a new, empty index file, truncating any existing one.
    pub fn create(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            config,
            path,
            inner: Mutex::new(FileHandle { file, len: 0 }),
        })
    }

    /// Opens an existing index file.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            config,
            path,
            inner: Mutex::new(FileHandle { file, len }),
        })
    }

    /// Returns the block size.
    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    /// Returns the index file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current file length in bytes.
    pub fn len(&self) -> u64 {
        self.inner.lock().len
    }

    /// Returns true when the file holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of whole blocks in the file.
    pub fn num_blocks(&self) -> u64 {
        self.len() / self.config.block_size as u64
    }

    /// Reads the block starting at `offset`.
    ///
    /// Returns exactly one block of bytes; fails if `offset` is not
    /// block-aligned or lies at or past end-of-file.
    pub fn read_block(&self, offset: BlockOffset) -> Result<Vec<u8>> {
        let block_size = self.config.block_size;
        if !is_aligned(offset, block_size) {
            return Err(LindexError::UnalignedOffset { offset, block_size });
        }

        let mut inner = self.inner.lock();
        if offset as u64 + block_size as u64 > inner.len {
            return Err(LindexError::OffsetOutOfRange {
                offset,
                len: inner.len,
            });
        }

        inner.file.seek(SeekFrom::Start(offset as u64))?;
        let mut buffer = vec![0u8; block_size];
        inner.file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    /// Overwrites the block starting at `offset`.
    ///
    /// Writing at `offset == len` extends the file by one block; anything
    /// further past end-of-file fails.
    pub fn write_block(&self, offset: BlockOffset, data: &[u8]) -> Result<()> {
        let block_size = self.config.block_size;
        if data.len() != block_size {
            return Err(LindexError::BlockSizeMismatch {
                expected: block_size,
                actual: data.len(),
            });
        }
        if !is_aligned(offset, block_size) {
            return Err(LindexError::UnalignedOffset { offset, block_size });
        }

        let mut inner = self.inner.lock();
        if offset as u64 > inner.len {
            return Err(LindexError::OffsetOutOfRange {
                offset,
                len: inner.len,
            });
        }

        inner.file.seek(SeekFrom::Start(offset as u64))?;
        inner.file.write_all(data)?;
        if self.config.fsync_enabled {
            inner.file.sync_all()?;
        }

        inner.len = inner.len.max(offset as u64 + block_size as u64);
        Ok(())
    }

    /// Appends one block at end-of-file and returns its starting offset.
    pub fn append_block(&self, data: &[u8]) -> Result<BlockOffset> {
        let block_size = self.config.block_size;
        if data.len() != block_size {
            return Err(LindexError::BlockSizeMismatch {
                expected: block_size,
                actual: data.len(),
            });
        }

        let mut inner = self.inner.lock();
        let offset = inner.len;
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(data)?;
        if self.config.fsync_enabled {
            inner.file.sync_all()?;
        }

        inner.len += block_size as u64;
        Ok(offset as BlockOffset)
    }
}
