//! Configuration structures for lindex.

use crate::layout::DEFAULT_BLOCK_SIZE;
use serde::{Deserialize, Serialize};

/// Storage configuration for one index file.
///
/// The block size is fixed when the index is created; opening an existing
/// index with a different block size is undefined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Block size in bytes.
    pub block_size: usize,
    /// Enable fsync after block writes.
    pub fsync_enabled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            fsync_enabled: true,
        }
    }
}
