//! Text index facade: coordinates the metadata header, tree engine, and
//! data file behind the four user-facing operations.

use crate::block::BlockStore;
use crate::datafile::DataFile;
use crate::meta::IndexMeta;
use crate::tree::BPlusTree;
use lindex_common::{LindexError, Result, StoreConfig};
use std::path::Path;
use tracing::info;

/// A B+ tree index over a newline-delimited text data file.
///
/// Keys are the first `key_len` bytes of each record, padded with trailing
/// spaces when a record is shorter. Uniqueness is enforced here, on the
/// insert path; the tree engine below is neutral to duplicates.
pub struct TextIndex {
    tree: BPlusTree,
    data: DataFile,
}

impl TextIndex {
    /// Builds an index from scratch by scanning the data file and
    /// inserting every record in file order.
    ///
    /// Overwrites any existing index file; running it twice over the same
    /// input produces an equivalent tree.
    pub fn create(
        data_path: &str,
        index_path: impl AsRef<Path>,
        key_len: i32,
        config: StoreConfig,
    ) -> Result<Self> {
        let meta = IndexMeta::for_create(data_path, key_len, config.block_size)?;
        let store = BlockStore::create(index_path, config)?;
        let mut tree = BPlusTree::create(store, meta)?;
        let data = DataFile::new(data_path);

        let mut count = 0u64;
        for record in data.records()? {
            let (offset, line) = record?;
            tree.insert(line.as_bytes(), offset)?;
            count += 1;
        }
        info!(records = count, data = data_path, "created index");

        Ok(Self { tree, data })
    }

    /// Opens an existing index; the data-file path comes from the header.
    pub fn open(index_path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let store = BlockStore::open(index_path, config)?;
        let tree = BPlusTree::open(store)?;
        let data = DataFile::new(tree.meta().data_filename.clone());
        Ok(Self { tree, data })
    }

    /// Returns the tree configuration.
    pub fn meta(&self) -> &IndexMeta {
        self.tree.meta()
    }

    /// Returns the underlying tree engine.
    pub fn tree(&self) -> &BPlusTree {
        &self.tree
    }

    /// Looks up a key (padded or truncated to the configured width) and
    /// materializes its record.
    pub fn find(&self, key: &str) -> Result<Option<(i64, String)>> {
        match self.tree.find(key.as_bytes())? {
            Some(offset) => Ok(Some((offset, self.data.read_at(offset)?))),
            None => Ok(None),
        }
    }

    /// Appends a record to the data file and indexes it.
    ///
    /// Rejects records shorter than the key width and records whose key is
    /// already present. Returns the record's data-file offset.
    pub fn insert(&mut self, record: &str) -> Result<i64> {
        let key_len = self.meta().key_len;
        if record.len() < key_len as usize {
            return Err(LindexError::KeyTooShort {
                len: record.len(),
                key_len,
            });
        }

        let key = &record.as_bytes()[..key_len as usize];
        if self.tree.find(key)?.is_some() {
            return Err(LindexError::DuplicateKey);
        }

        let offset = self.data.append(record)?;
        self.tree.insert(key, offset)?;
        Ok(offset)
    }

    /// Emits up to `count` records starting from the first key matching
    /// `start_key`, in key order across the leaf chain.
    pub fn list(&self, start_key: &str, count: usize) -> Result<Vec<(i64, String)>> {
        let mut out = Vec::new();
        for (offset, _key) in self.tree.scan_from(start_key.as_bytes(), count)? {
            out.push((offset, self.data.read_at(offset)?));
        }
        Ok(out)
    }
}
