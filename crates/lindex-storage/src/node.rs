//! Node codec: one B+ tree node serialized per block.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use lindex_common::layout::NODE_OVERHEAD;
use lindex_common::{BlockOffset, LindexError, Result, NIL};

/// A single B+ tree node, decoded from (or about to be encoded into) one
/// block of the index file.
///
/// Block layout:
/// - is_leaf: 1 byte
/// - next: 8 bytes (i64 LE, -1 when absent)
/// - prev: 8 bytes (i64 LE, -1 when absent)
/// - n_keys: 8 bytes (i64 LE)
/// - keys: n_keys * (key_len + 1) bytes, each key NUL-terminated
/// - payload: leaf nodes carry n_keys data-file offsets, internal nodes
///   n_keys + 1 child block offsets (8 bytes each, i64 LE)
/// - remainder zeroed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Leaf or internal.
    pub is_leaf: bool,
    /// Next sibling leaf, NIL for internal nodes and the rightmost leaf.
    pub next: BlockOffset,
    /// Previous sibling leaf, NIL for internal nodes and the leftmost leaf.
    pub prev: BlockOffset,
    /// Keys in ascending order, each exactly key_len bytes.
    pub keys: Vec<Bytes>,
    /// Leaf: data-file offsets parallel to `keys`. Internal: child block
    /// offsets, one more than `keys`. Child `i` holds keys strictly less
    /// than `keys[i]`; the last child holds the rest.
    pub pointers: Vec<i64>,
}

impl Node {
    /// Creates an empty leaf.
    pub fn leaf() -> Self {
        Self {
            is_leaf: true,
            next: NIL,
            prev: NIL,
            keys: Vec::new(),
            pointers: Vec::new(),
        }
    }

    /// Creates an empty internal node.
    pub fn internal() -> Self {
        Self {
            is_leaf: false,
            next: NIL,
            prev: NIL,
            keys: Vec::new(),
            pointers: Vec::new(),
        }
    }

    /// Encoded size of this node for the given key width.
    pub fn encoded_len(&self, key_len: i32) -> usize {
        NODE_OVERHEAD + self.keys.len() * (key_len as usize + 1) + self.pointers.len() * 8
    }

    /// Serializes the node into a full zero-padded block.
    pub fn encode(&self, block_size: usize, key_len: i32) -> Result<BytesMut> {
        debug_assert!(self.keys.iter().all(|k| k.len() == key_len as usize));
        debug_assert_eq!(
            self.pointers.len(),
            self.keys.len() + usize::from(!self.is_leaf)
        );

        let needed = self.encoded_len(key_len);
        if needed > block_size {
            return Err(LindexError::NodeOverflow {
                needed,
                block_size,
            });
        }

        let mut buf = BytesMut::with_capacity(block_size);
        buf.put_u8(u8::from(self.is_leaf));
        buf.put_i64_le(self.next);
        buf.put_i64_le(self.prev);
        buf.put_i64_le(self.keys.len() as i64);
        for key in &self.keys {
            buf.put_slice(key);
            buf.put_u8(0);
        }
        for pointer in &self.pointers {
            buf.put_i64_le(*pointer);
        }
        buf.resize(block_size, 0);
        Ok(buf)
    }

    /// Deserializes a node from a block buffer.
    ///
    /// `offset` is only used for error context. The key count is
    /// sanity-checked against the buffer before any payload is read.
    pub fn decode(offset: BlockOffset, buf: &[u8], key_len: i32) -> Result<Self> {
        let corrupt = |reason: String| LindexError::CorruptNode { offset, reason };

        if buf.len() < NODE_OVERHEAD {
            return Err(corrupt(format!("block is {} bytes", buf.len())));
        }

        let mut rest = buf;
        let is_leaf = match rest.get_u8() {
            0 => false,
            1 => true,
            flag => return Err(corrupt(format!("leaf flag {flag}"))),
        };
        let next = rest.get_i64_le();
        let prev = rest.get_i64_le();
        let n_keys = rest.get_i64_le();

        if n_keys < 0 {
            return Err(corrupt(format!("key count {n_keys}")));
        }
        let n_keys = n_keys as usize;
        let n_pointers = n_keys + usize::from(!is_leaf);
        let needed = NODE_OVERHEAD + n_keys * (key_len as usize + 1) + n_pointers * 8;
        if needed > buf.len() {
            return Err(corrupt(format!(
                "key count {n_keys} does not fit a {}-byte block",
                buf.len()
            )));
        }

        let mut keys = Vec::with_capacity(n_keys);
        for _ in 0..n_keys {
            keys.push(Bytes::copy_from_slice(&rest[..key_len as usize]));
            rest.advance(key_len as usize + 1); // skip the key terminator
        }

        let mut pointers = Vec::with_capacity(n_pointers);
        for _ in 0..n_pointers {
            pointers.push(rest.get_i64_le());
        }

        Ok(Self {
            is_leaf,
            next,
            prev,
            keys,
            pointers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn test_leaf_roundtrip() {
        let node = Node {
            is_leaf: true,
            next: 3072,
            prev: NIL,
            keys: vec![key("AAA"), key("BBB"), key("CCC")],
            pointers: vec![0, 27, 54],
        };

        let buf = node.encode(1024, 3).unwrap();
        assert_eq!(buf.len(), 1024);
        let decoded = Node::decode(1024, &buf, 3).unwrap();
        assert_eq!(decoded, node);
    }

    #[test]
    fn test_internal_roundtrip() {
        let node = Node {
            is_leaf: false,
            next: NIL,
            prev: NIL,
            keys: vec![key("M____")],
            pointers: vec![1024, 2048],
        };

        let buf = node.encode(1024, 5).unwrap();
        let decoded = Node::decode(2048, &buf, 5).unwrap();
        assert_eq!(decoded, node);
    }

    #[test]
    fn test_empty_leaf_roundtrip() {
        let node = Node::leaf();
        let buf = node.encode(128, 1).unwrap();
        let decoded = Node::decode(128, &buf, 1).unwrap();
        assert_eq!(decoded, node);
    }

    #[test]
    fn test_encode_zero_fills_tail() {
        let node = Node {
            is_leaf: true,
            next: NIL,
            prev: NIL,
            keys: vec![key("K")],
            pointers: vec![42],
        };

        let buf = node.encode(128, 1).unwrap();
        let used = node.encoded_len(1);
        assert_eq!(used, NODE_OVERHEAD + 2 + 8);
        assert!(buf[used..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_key_terminators() {
        let node = Node {
            is_leaf: true,
            next: NIL,
            prev: NIL,
            keys: vec![key("AB"), key("CD")],
            pointers: vec![1, 2],
        };

        let buf = node.encode(128, 2).unwrap();
        assert_eq!(&buf[NODE_OVERHEAD..NODE_OVERHEAD + 3], b"AB\0");
        assert_eq!(&buf[NODE_OVERHEAD + 3..NODE_OVERHEAD + 6], b"CD\0");
    }

    #[test]
    fn test_encode_overflow_rejected() {
        let mut node = Node::leaf();
        for i in 0..8 {
            node.keys.push(key(&format!("{i}")));
            node.pointers.push(i);
        }
        // 25 + 8*2 + 8*8 = 105 bytes does not fit a 64-byte block.
        assert!(matches!(
            node.encode(64, 1),
            Err(LindexError::NodeOverflow { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_bad_flag() {
        let node = Node::leaf();
        let mut buf = node.encode(128, 1).unwrap();
        buf[0] = 7;
        assert!(matches!(
            Node::decode(128, &buf, 1),
            Err(LindexError::CorruptNode { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_absurd_key_count() {
        let node = Node::leaf();
        let mut buf = node.encode(128, 1).unwrap();
        buf[17..25].copy_from_slice(&(1_000_000i64).to_le_bytes());
        assert!(matches!(
            Node::decode(128, &buf, 1),
            Err(LindexError::CorruptNode { .. })
        ));

        buf[17..25].copy_from_slice(&(-1i64).to_le_bytes());
        assert!(matches!(
            Node::decode(128, &buf, 1),
            Err(LindexError::CorruptNode { .. })
        ));
    }
}
