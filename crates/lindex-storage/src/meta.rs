//! Metadata header stored in block 0 of the index file.

use crate::block::BlockStore;
use bytes::{Buf, BufMut, BytesMut};
use lindex_common::layout::{fanout, FILENAME_FIELD};
use lindex_common::{BlockOffset, LindexError, Result};

/// Configuration of one logical tree, persisted in block 0.
///
/// Layout within the first block:
/// - data_filename: 256 bytes, NUL-padded
/// - key_len: 4 bytes (i32 LE)
/// - degree: 4 bytes (i32 LE)
/// - root_offset: 8 bytes (i64 LE)
/// - remainder zeroed
///
/// Written whole-block by `create` and whenever root promotion moves the
/// root; read once at the start of every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMeta {
    /// Path of the record-bearing data file.
    pub data_filename: String,
    /// Fixed key width in bytes.
    pub key_len: i32,
    /// Fanout parameter `t`; non-root nodes hold between `t` and `2t` keys.
    pub degree: i32,
    /// Byte offset of the current root node.
    pub root_offset: BlockOffset,
}

impl IndexMeta {
    /// Byte position of `key_len` within the header block.
    pub const KEY_LEN_AT: usize = FILENAME_FIELD;
    /// Byte position of `degree` within the header block.
    pub const DEGREE_AT: usize = FILENAME_FIELD + 4;
    /// Byte position of `root_offset` within the header block.
    pub const ROOT_AT: usize = FILENAME_FIELD + 8;

    /// Builds and validates the metadata for a fresh index.
    ///
    /// The initial root offset is the first block after the header; the
    /// root node itself is written by the first insertion.
    pub fn for_create(data_filename: &str, key_len: i32, block_size: usize) -> Result<Self> {
        if data_filename.len() > FILENAME_FIELD {
            return Err(LindexError::FilenameTooLong {
                len: data_filename.len(),
                max: FILENAME_FIELD,
            });
        }
        if key_len <= 0 {
            return Err(LindexError::InvalidKeyLength(key_len));
        }
        let degree = fanout(block_size, key_len);
        if degree < 1 {
            return Err(LindexError::DegreeTooSmall {
                block_size,
                key_len,
            });
        }

        Ok(Self {
            data_filename: data_filename.to_string(),
            key_len,
            degree,
            root_offset: block_size as BlockOffset,
        })
    }

    /// Serializes the header into a full zero-padded block.
    pub fn encode(&self, block_size: usize) -> BytesMut {
        debug_assert!(self.data_filename.len() <= FILENAME_FIELD);

        let mut buf = BytesMut::with_capacity(block_size);
        buf.put_slice(self.data_filename.as_bytes());
        buf.resize(FILENAME_FIELD, 0);
        buf.put_i32_le(self.key_len);
        buf.put_i32_le(self.degree);
        buf.put_i64_le(self.root_offset);
        buf.resize(block_size, 0);
        buf
    }

    /// Deserializes the header from a block buffer.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::ROOT_AT + 8 {
            return Err(LindexError::CorruptHeader(format!(
                "header block is {} bytes, need at least {}",
                buf.len(),
                Self::ROOT_AT + 8
            )));
        }

        let name_field = &buf[..FILENAME_FIELD];
        let name_end = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FILENAME_FIELD);
        let data_filename = std::str::from_utf8(&name_field[..name_end])
            .map_err(|_| LindexError::CorruptHeader("data filename is not UTF-8".to_string()))?
            .to_string();

        let mut rest = &buf[FILENAME_FIELD..];
        let key_len = rest.get_i32_le();
        let degree = rest.get_i32_le();
        let root_offset = rest.get_i64_le();

        if key_len <= 0 {
            return Err(LindexError::CorruptHeader(format!(
                "key length {key_len}"
            )));
        }
        if degree < 1 {
            return Err(LindexError::CorruptHeader(format!("degree {degree}")));
        }
        if root_offset <= 0 {
            return Err(LindexError::CorruptHeader(format!(
                "root offset {root_offset}"
            )));
        }

        Ok(Self {
            data_filename,
            key_len,
            degree,
            root_offset,
        })
    }

    /// Full-block overwrite of block 0.
    pub fn write_to(&self, store: &BlockStore) -> Result<()> {
        store.write_block(0, &self.encode(store.block_size()))
    }

    /// Reads the header back from block 0.
    pub fn read_from(store: &BlockStore) -> Result<Self> {
        Self::decode(&store.read_block(0)?)
    }
}
