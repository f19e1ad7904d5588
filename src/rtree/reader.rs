use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::geom::BBox;
use crate::rtree::node::read_node_at;
use crate::rtree::{ChildRef, LeafEntry, Node, NodeCache};

/// Location of a tree inside some byte stream.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeSpan {
    /// Absolute position of relative offset 0.
    pub(crate) base: u64,
    /// Length of the tree block in bytes.
    pub(crate) len: u64,
    pub(crate) root: Option<ChildRef>,
    /// Cache identity of this tree.
    pub(crate) token: u64,
}

fn load<R: Read + Seek>(reader: &mut R, span: &TreeSpan, offset: u64, cache: &mut NodeCache) -> Result<Arc<Node>> {
    if let Some(node) = cache.get(offset) {
        return Ok(node);
    }
    let node = Arc::new(read_node_at(reader, span.base, span.len, offset)?);
    cache.put(offset, Arc::clone(&node));
    Ok(node)
}

/// Ids of every leaf whose box intersects `bbox`, in left-to-right leaf order.
pub(crate) fn range_query<R: Read + Seek>(
    reader: &mut R,
    span: &TreeSpan,
    bbox: &BBox,
    cache: &mut NodeCache,
) -> Result<Vec<i64>> {
    let mut out = Vec::new();
    let Some(root) = span.root.filter(|root| root.bbox.intersects(bbox)) else {
        return Ok(out);
    };
    cache.bind(span.token);

    let mut stack = vec![root.offset];
    while let Some(offset) = stack.pop() {
        let node = load(reader, span, offset, cache)?;
        match &*node {
            Node::Leaf { entries, .. } => {
                out.extend(entries.iter().filter(|e| e.bbox.intersects(bbox)).map(|e| e.id));
            }
            Node::Internal { children, .. } => {
                stack.extend(children.iter().rev().filter(|c| c.bbox.intersects(bbox)).map(|c| c.offset));
            }
        }
    }
    Ok(out)
}

/// Walk every leaf entry left to right.
pub(crate) fn for_each_leaf<R: Read + Seek>(
    reader: &mut R,
    span: &TreeSpan,
    cache: &mut NodeCache,
    mut visit: impl FnMut(&LeafEntry),
) -> Result<()> {
    let Some(root) = span.root else { return Ok(()) };
    cache.bind(span.token);

    let mut stack = vec![root.offset];
    while let Some(offset) = stack.pop() {
        let node = load(reader, span, offset, cache)?;
        match &*node {
            Node::Leaf { entries, .. } => entries.iter().for_each(&mut visit),
            Node::Internal { children, .. } => stack.extend(children.iter().rev().map(|c| c.offset)),
        }
    }
    Ok(())
}

/// Walk a tree block that was just read from a container and check its structure: every node's
/// box equals the box its parent recorded and contains all of its entries, children come after
/// their parents, all leaves sit at the same depth, and the node count and byte length agree with
/// the section header. Returns the leaf entries in stored order.
pub(crate) fn check_tree(tree: &[u8], node_count: u32, root_bbox: &BBox) -> Result<Vec<LeafEntry>> {
    let len = tree.len() as u64;
    if node_count == 0 {
        if len != 0 {
            return Err(Error::format(format!("empty tree with {len} bytes of nodes")));
        }
        return Ok(Vec::new());
    }

    let mut cursor = Cursor::new(tree);
    let mut leaves = Vec::new();
    let mut visited = 0u32;
    let mut bytes = 0u64;
    let mut leaf_depth = None;
    let mut stack = vec![(0u64, *root_bbox, 0usize)];
    while let Some((offset, expected, depth)) = stack.pop() {
        visited += 1;
        if visited > node_count {
            return Err(Error::format(format!("tree has more than the {node_count} nodes its header claims")));
        }
        let node = read_node_at(&mut cursor, 0, len, offset)?;
        if node.bbox() != &expected {
            return Err(Error::format(format!("node at {offset} disagrees with the box its parent recorded")));
        }
        if node.len() == 0 {
            return Err(Error::format(format!("empty node at {offset}")));
        }
        bytes += node.encoded_len() as u64;
        match node {
            Node::Leaf { bbox, entries } => {
                if *leaf_depth.get_or_insert(depth) != depth {
                    return Err(Error::format("tree leaves are not all at the same depth"));
                }
                if !entries.iter().all(|e| bbox.contains_box(&e.bbox)) {
                    return Err(Error::format(format!("leaf at {offset} does not contain its entries")));
                }
                leaves.extend(entries);
            }
            Node::Internal { bbox, children } => {
                for child in children.iter().rev() {
                    if child.offset <= offset {
                        return Err(Error::format(format!("child at {} precedes its parent at {offset}", child.offset)));
                    }
                    if !bbox.contains_box(&child.bbox) {
                        return Err(Error::format(format!("node at {offset} does not contain its children")));
                    }
                    stack.push((child.offset, child.bbox, depth + 1));
                }
            }
        }
    }
    if visited != node_count || bytes != len {
        return Err(Error::format(format!(
            "tree header claims {node_count} nodes in {len} bytes, found {visited} in {bytes}"
        )));
    }
    Ok(leaves)
}

/// The tree of one band of a stored container, queried straight from disk.
#[derive(Debug)]
pub struct StoredTree {
    file: File,
    span: TreeSpan,
    node_count: u32,
}

impl StoredTree {
    pub(crate) fn new(file: File, span: TreeSpan, node_count: u32) -> Self {
        Self { file, span, node_count }
    }

    #[inline] pub fn node_count(&self) -> u32 { self.node_count }

    #[inline] pub fn root_bbox(&self) -> Option<BBox> { self.span.root.map(|r| r.bbox) }

    /// Ids whose box intersects `bbox`. No false negatives; false positives are possible.
    pub fn range_query(&mut self, bbox: &BBox, cache: &mut NodeCache) -> Result<Vec<i64>> {
        range_query(&mut self.file, &self.span, bbox, cache)
    }

    /// Every indexed id in stored order.
    pub fn leaf_ids(&mut self, cache: &mut NodeCache) -> Result<Vec<i64>> {
        let mut ids = Vec::new();
        for_each_leaf(&mut self.file, &self.span, cache, |e| ids.push(e.id))?;
        Ok(ids)
    }
}
