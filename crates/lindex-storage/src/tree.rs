//! B+ tree engine: point lookup, range enumeration, and insertion with
//! splits propagating up to the root.
//!
//! Nodes are re-read from disk on every visit; the only state carried
//! between operations is the metadata header in block 0. All leaves sit at
//! the same depth and are chained through next/prev offsets for range
//! scans.

use crate::block::BlockStore;
use crate::meta::IndexMeta;
use crate::node::Node;
use bytes::{BufMut, Bytes, BytesMut};
use lindex_common::{BlockOffset, Result, NIL};
use tracing::debug;

/// The outcome of an insertion that overflowed a node: the new right
/// sibling and the separator key the parent must adopt for it.
///
/// For a leaf split the separator is the sibling's first key; for an
/// internal split it is the promoted median, which lives in neither half.
struct Split {
    separator: Bytes,
    right: BlockOffset,
}

/// Disk-resident B+ tree over fixed-size blocks.
///
/// One operation at a time; every mutation persists before the call
/// returns, with the metadata header rewritten last whenever the root
/// moves.
pub struct BPlusTree {
    store: BlockStore,
    meta: IndexMeta,
}

impl BPlusTree {
    /// Initializes a fresh tree: writes the metadata header into block 0.
    ///
    /// The root leaf itself is created by the first insertion, at the
    /// offset the header already points to.
    pub fn create(store: BlockStore, meta: IndexMeta) -> Result<Self> {
        meta.write_to(&store)?;
        Ok(Self { store, meta })
    }

    /// Opens an existing tree by reading the metadata header.
    pub fn open(store: BlockStore) -> Result<Self> {
        let meta = IndexMeta::read_from(&store)?;
        Ok(Self { store, meta })
    }

    /// Returns the tree configuration.
    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// Returns the current root offset.
    pub fn root_offset(&self) -> BlockOffset {
        self.meta.root_offset
    }

    /// Returns true while no root node has been written yet.
    pub fn is_empty(&self) -> bool {
        self.meta.root_offset as u64 >= self.store.len()
    }

    /// Pads a key with trailing spaces, or truncates it, to the configured
    /// key width.
    pub fn normalize_key(&self, key: &[u8]) -> Bytes {
        let key_len = self.meta.key_len as usize;
        let mut buf = BytesMut::with_capacity(key_len);
        buf.put_slice(&key[..key.len().min(key_len)]);
        buf.resize(key_len, b' ');
        buf.freeze()
    }

    /// Reads and decodes the node at `offset`.
    pub fn read_node(&self, offset: BlockOffset) -> Result<Node> {
        Node::decode(offset, &self.store.read_block(offset)?, self.meta.key_len)
    }

    fn write_node(&self, offset: BlockOffset, node: &Node) -> Result<()> {
        let buf = node.encode(self.store.block_size(), self.meta.key_len)?;
        self.store.write_block(offset, &buf)
    }

    fn append_node(&self, node: &Node) -> Result<BlockOffset> {
        let buf = node.encode(self.store.block_size(), self.meta.key_len)?;
        self.store.append_block(&buf)
    }

    /// Upper key bound per node; one more forces a split.
    fn max_keys(&self) -> usize {
        2 * self.meta.degree as usize
    }

    /// Index of the child to descend into: the first separator strictly
    /// greater than `key`, or the rightmost child when none is.
    fn child_index(node: &Node, key: &Bytes) -> usize {
        node.keys.partition_point(|k| k <= key)
    }

    /// Point lookup. Returns the data-file offset paired with `key`, after
    /// normalizing it to the configured width.
    pub fn find(&self, key: &[u8]) -> Result<Option<i64>> {
        if self.is_empty() {
            return Ok(None);
        }

        let key = self.normalize_key(key);
        let mut offset = self.meta.root_offset;
        loop {
            let node = self.read_node(offset)?;
            if node.is_leaf {
                return Ok(node
                    .keys
                    .iter()
                    .position(|k| *k == key)
                    .map(|i| node.pointers[i]));
            }
            offset = node.pointers[Self::child_index(&node, &key)];
        }
    }

    /// Range-start enumeration: up to `count` entries beginning at
    /// `target`, following the leaf chain across node boundaries.
    ///
    /// The start position inside the located leaf is the entry equal to
    /// the target, or the one the target falls directly before, or entry 0
    /// of a single-entry leaf. Without a start position nothing is
    /// emitted.
    pub fn scan_from(&self, target: &[u8], count: usize) -> Result<Vec<(i64, Bytes)>> {
        let mut out = Vec::new();
        if self.is_empty() || count == 0 {
            return Ok(out);
        }

        let target = self.normalize_key(target);
        let mut node = self.read_node(self.meta.root_offset)?;
        while !node.is_leaf {
            node = self.read_node(node.pointers[Self::child_index(&node, &target)])?;
        }

        let mut start = None;
        for i in 0..node.keys.len() {
            if node.keys[i] == target
                || (i > 0 && node.keys[i - 1] < target && target < node.keys[i])
                || node.keys.len() == 1
            {
                start = Some(i);
                break;
            }
        }
        let Some(mut at) = start else {
            return Ok(out);
        };

        loop {
            while at < node.keys.len() && out.len() < count {
                out.push((node.pointers[at], node.keys[at].clone()));
                at += 1;
            }
            if out.len() >= count || node.next == NIL {
                return Ok(out);
            }
            node = self.read_node(node.next)?;
            at = 0;
        }
    }

    /// Inserts a key/data-offset pair, splitting overfull nodes bottom-up
    /// and promoting a new root when a split reaches the top.
    ///
    /// The engine itself is neutral to duplicate keys; callers enforce
    /// uniqueness with a prior `find`.
    pub fn insert(&mut self, key: &[u8], data_offset: i64) -> Result<()> {
        let key = self.normalize_key(key);

        if self.is_empty() {
            let mut root = Node::leaf();
            root.keys.push(key);
            root.pointers.push(data_offset);
            self.write_node(self.meta.root_offset, &root)?;
            debug!(offset = self.meta.root_offset, "wrote initial root leaf");
            return Ok(());
        }

        let Some(split) = self.insert_into(self.meta.root_offset, key, data_offset)? else {
            return Ok(());
        };

        // The root itself split: synthesize a new internal root over the
        // two halves. The header update is the operation's final write.
        let mut new_root = Node::internal();
        new_root.keys.push(split.separator);
        new_root.pointers.push(self.meta.root_offset);
        new_root.pointers.push(split.right);
        let offset = self.append_node(&new_root)?;

        self.meta.root_offset = offset;
        self.meta.write_to(&self.store)?;
        debug!(root = offset, "promoted new root");
        Ok(())
    }

    /// Recursive insertion. Returns the split descriptor when this node
    /// overflowed and handed a new right sibling up to its parent.
    fn insert_into(
        &mut self,
        offset: BlockOffset,
        key: Bytes,
        data_offset: i64,
    ) -> Result<Option<Split>> {
        let mut node = self.read_node(offset)?;

        if node.is_leaf {
            let at = node.keys.partition_point(|k| k <= &key);
            node.keys.insert(at, key);
            node.pointers.insert(at, data_offset);

            if node.keys.len() <= self.max_keys() {
                self.write_node(offset, &node)?;
                return Ok(None);
            }
            return self.split_leaf(offset, node).map(Some);
        }

        let child = node.pointers[Self::child_index(&node, &key)];
        let Some(split) = self.insert_into(child, key, data_offset)? else {
            return Ok(None);
        };

        let at = node.keys.partition_point(|k| k <= &split.separator);
        node.keys.insert(at, split.separator);
        node.pointers.insert(at + 1, split.right);

        if node.keys.len() <= self.max_keys() {
            self.write_node(offset, &node)?;
            return Ok(None);
        }
        self.split_internal(offset, node).map(Some)
    }

    /// Splits an overfull leaf holding `2t + 1` entries: the upper `t + 1`
    /// move to a new right sibling, whose first key becomes the separator.
    ///
    /// The sibling is appended first so its offset is valid before any
    /// chain link refers to it; then the original is rewritten, then the
    /// old right neighbor's back link.
    fn split_leaf(&mut self, offset: BlockOffset, mut node: Node) -> Result<Split> {
        let t = self.meta.degree as usize;

        let mut right = Node::leaf();
        right.keys = node.keys.split_off(t);
        right.pointers = node.pointers.split_off(t);

        let old_next = node.next;
        right.prev = offset;
        right.next = old_next;
        let separator = right.keys[0].clone();

        let right_offset = self.append_node(&right)?;
        node.next = right_offset;
        self.write_node(offset, &node)?;

        if old_next != NIL {
            let mut neighbor = self.read_node(old_next)?;
            neighbor.prev = right_offset;
            self.write_node(old_next, &neighbor)?;
        }

        debug!(left = offset, right = right_offset, "split leaf");
        Ok(Split {
            separator,
            right: right_offset,
        })
    }

    /// Splits an overfull internal node holding `2t + 1` keys: the median
    /// promotes to the parent, the upper `t` keys and `t + 1` children
    /// move to a new right sibling, and the original keeps the lower `t`
    /// keys and `t + 1` children.
    fn split_internal(&mut self, offset: BlockOffset, mut node: Node) -> Result<Split> {
        let t = self.meta.degree as usize;

        let separator = node.keys[t].clone();
        let mut right = Node::internal();
        right.keys = node.keys.split_off(t + 1);
        right.pointers = node.pointers.split_off(t + 1);
        node.keys.truncate(t);

        let right_offset = self.append_node(&right)?;
        self.write_node(offset, &node)?;

        debug!(left = offset, right = right_offset, "split internal node");
        Ok(Split {
            separator,
            right: right_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lindex_common::StoreConfig;
    use tempfile::tempdir;

    /// A 128-byte block with 1-byte keys gives t = 4, so a leaf splits on
    /// the 9th insertion.
    fn small_tree(dir: &tempfile::TempDir) -> BPlusTree {
        let config = StoreConfig {
            block_size: 128,
            fsync_enabled: false,
        };
        let store = BlockStore::create(dir.path().join("idx"), config).unwrap();
        let meta = IndexMeta::for_create("data.txt", 1, 128).unwrap();
        BPlusTree::create(store, meta).unwrap()
    }

    #[test]
    fn test_empty_tree_reports_absent() {
        let dir = tempdir().unwrap();
        let tree = small_tree(&dir);
        assert!(tree.is_empty());
        assert_eq!(tree.find(b"A").unwrap(), None);
        assert!(tree.scan_from(b"A", 5).unwrap().is_empty());
    }

    #[test]
    fn test_first_insert_creates_root_leaf() {
        let dir = tempdir().unwrap();
        let mut tree = small_tree(&dir);

        tree.insert(b"A", 0).unwrap();
        assert!(!tree.is_empty());
        assert_eq!(tree.root_offset(), 128);

        let root = tree.read_node(tree.root_offset()).unwrap();
        assert!(root.is_leaf);
        assert_eq!(root.keys.len(), 1);
        assert_eq!(tree.find(b"A").unwrap(), Some(0));
    }

    #[test]
    fn test_normalize_pads_and_truncates() {
        let dir = tempdir().unwrap();
        let config = StoreConfig {
            block_size: 1024,
            fsync_enabled: false,
        };
        let store = BlockStore::create(dir.path().join("idx"), config).unwrap();
        let meta = IndexMeta::for_create("data.txt", 5, 1024).unwrap();
        let tree = BPlusTree::create(store, meta).unwrap();

        assert_eq!(tree.normalize_key(b"HI").as_ref(), b"HI   ");
        assert_eq!(tree.normalize_key(b"ABCDEFGH").as_ref(), b"ABCDE");
        assert_eq!(tree.normalize_key(b"").as_ref(), b"     ");
    }

    #[test]
    fn test_inserts_without_split_stay_sorted() {
        let dir = tempdir().unwrap();
        let mut tree = small_tree(&dir);

        for (i, k) in [b"D", b"A", b"C", b"B"].iter().enumerate() {
            tree.insert(*k, i as i64 * 10).unwrap();
        }

        let root = tree.read_node(tree.root_offset()).unwrap();
        assert!(root.is_leaf);
        let keys: Vec<&[u8]> = root.keys.iter().map(|k| k.as_ref()).collect();
        assert_eq!(keys, vec![b"A", b"B", b"C", b"D"]);
        assert_eq!(tree.find(b"C").unwrap(), Some(20));
    }

    #[test]
    fn test_leaf_split_promotes_root() {
        let dir = tempdir().unwrap();
        let mut tree = small_tree(&dir);

        let old_root = tree.root_offset();
        for (i, b) in (b'A'..=b'I').enumerate() {
            tree.insert(&[b], i as i64).unwrap();
        }

        // Nine keys at t = 4 overflow the root leaf.
        assert_ne!(tree.root_offset(), old_root);
        let root = tree.read_node(tree.root_offset()).unwrap();
        assert!(!root.is_leaf);
        assert_eq!(root.keys.len(), 1);
        assert_eq!(root.pointers.len(), 2);
        assert_eq!(root.keys[0].as_ref(), b"E");

        let left = tree.read_node(root.pointers[0]).unwrap();
        let right = tree.read_node(root.pointers[1]).unwrap();
        assert_eq!(left.keys.len(), 4);
        assert_eq!(right.keys.len(), 5);
        assert_eq!(left.next, root.pointers[1]);
        assert_eq!(right.prev, root.pointers[0]);
        assert_eq!(right.next, NIL);

        // Header persisted the new root.
        let reread = IndexMeta::read_from(tree_store(&tree)).unwrap();
        assert_eq!(reread.root_offset, tree.root_offset());

        for (i, b) in (b'A'..=b'I').enumerate() {
            assert_eq!(tree.find(&[b]).unwrap(), Some(i as i64));
        }
    }

    fn tree_store(tree: &BPlusTree) -> &BlockStore {
        &tree.store
    }

    #[test]
    fn test_scan_crosses_leaf_boundary() {
        let dir = tempdir().unwrap();
        let mut tree = small_tree(&dir);

        for (i, b) in (b'A'..=b'M').enumerate() {
            tree.insert(&[b], i as i64).unwrap();
        }

        let hits = tree.scan_from(b"C", 6).unwrap();
        let keys: Vec<u8> = hits.iter().map(|(_, k)| k[0]).collect();
        assert_eq!(keys, b"CDEFGH".to_vec());
        assert_eq!(hits[0].0, 2);
    }

    #[test]
    fn test_scan_stops_at_chain_end() {
        let dir = tempdir().unwrap();
        let mut tree = small_tree(&dir);

        for (i, b) in (b'A'..=b'F').enumerate() {
            tree.insert(&[b], i as i64).unwrap();
        }

        let hits = tree.scan_from(b"D", 100).unwrap();
        let keys: Vec<u8> = hits.iter().map(|(_, k)| k[0]).collect();
        assert_eq!(keys, b"DEF".to_vec());
    }

    #[test]
    fn test_scan_unmatched_start_is_empty() {
        let dir = tempdir().unwrap();
        let mut tree = small_tree(&dir);

        for b in [b'B', b'D', b'F'] {
            tree.insert(&[b], 0).unwrap();
        }

        // "A" precedes every key in a multi-entry leaf: no start position.
        assert!(tree.scan_from(b"A", 5).unwrap().is_empty());
        // Exact match still works.
        assert_eq!(tree.scan_from(b"D", 5).unwrap().len(), 2);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path;
        {
            let mut tree = small_tree(&dir);
            path = tree.store.path().to_path_buf();
            for (i, b) in (b'A'..=b'K').enumerate() {
                tree.insert(&[b], i as i64).unwrap();
            }
        }

        let config = StoreConfig {
            block_size: 128,
            fsync_enabled: false,
        };
        let tree = BPlusTree::open(BlockStore::open(&path, config).unwrap()).unwrap();
        for (i, b) in (b'A'..=b'K').enumerate() {
            assert_eq!(tree.find(&[b]).unwrap(), Some(i as i64));
        }
        assert_eq!(tree.find(b"Z").unwrap(), None);
    }
}
