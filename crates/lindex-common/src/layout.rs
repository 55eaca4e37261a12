//! On-disk layout constants for the index file.

/// Default block size in bytes (1 KB).
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Byte offset of a block within the index file.
///
/// Always a multiple of the block size. Block 0 is the metadata header and
/// never holds a node.
pub type BlockOffset = i64;

/// Sentinel offset meaning "no block": an absent sibling or an unwritten
/// node.
pub const NIL: BlockOffset = -1;

/// Fixed per-node overhead within a block: the leaf flag byte plus the
/// next/prev links and the key count (three i64 fields).
pub const NODE_OVERHEAD: usize = 25;

/// Width of the data-filename field in the metadata header.
pub const FILENAME_FIELD: usize = 256;

/// Largest record the data-file reader will materialize in one call.
pub const MAX_RECORD_LEN: usize = 1024;

/// Fanout parameter `t` for a given block size and key width.
///
/// A non-root node holds between `t` and `2t` keys. `t` is the largest
/// count such that a full node still encodes into one block; the binding
/// case is an internal node carrying `2t` keys (each `key_len + 1` bytes
/// with its terminator) and `2t + 1` child links.
pub fn fanout(block_size: usize, key_len: i32) -> i32 {
    if key_len <= 0 {
        return 0;
    }
    let entry = key_len as usize + 1 + 8;
    let fixed = NODE_OVERHEAD + 8;
    (block_size.saturating_sub(fixed) / (2 * entry)) as i32
}

/// Returns true when `offset` sits on the block grid.
pub fn is_aligned(offset: BlockOffset, block_size: usize) -> bool {
    offset >= 0 && offset % block_size as i64 == 0
}
