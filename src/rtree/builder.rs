use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use bytes::BufMut;

use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::geom::BBox;
use crate::io::fs::{scratch_name, ScratchFile};
use crate::io::wire;
use crate::rtree::next_tree_token;
use crate::rtree::node::{read_node_at, ENTRY_LEN};
use crate::rtree::reader::{self, TreeSpan};
use crate::rtree::{ChildRef, LeafEntry, Node, NodeCache};
use crate::snapshot::ZoomBand;

/// Two-phase packed R-tree construction for one zoom band.
///
/// `insert` appends leaf entries to a scratch file in arrival order. `finish` packs them with
/// sort-tile-recursive into full nodes, written bottom-up to a second scratch file. Both scratch
/// files are deleted when the value holding them is dropped, whichever way the build ends.
///
/// `finish` reads every leaf entry back into memory before sorting, so peak memory grows with the
/// leaf count (`8 + 16` bytes per entry). The scratch files bound the node output, not the sort.
#[derive(Debug)]
pub struct RTreeBuilder {
    capacity: usize,
    dir: PathBuf,
    nodes_name: String,
    band: ZoomBand,
    leaves: ScratchFile,
    writer: BufWriter<File>,
    count: u64,
}

impl RTreeBuilder {
    /// Start a build whose scratch files live in `scratch_dir`, named after `output` and `band`.
    pub fn new(config: &BuildConfig, scratch_dir: &Path, output: &Path, band: ZoomBand) -> Result<Self> {
        config.validate()?;
        let leaves = ScratchFile::create(scratch_dir, &scratch_name(output, band, "leaves"))?;
        let writer = BufWriter::new(leaves.reopen()?);
        Ok(Self {
            capacity: config.node_capacity,
            dir: scratch_dir.to_path_buf(),
            nodes_name: scratch_name(output, band, "nodes"),
            band,
            leaves,
            writer,
            count: 0,
        })
    }

    /// Build a tree over `leaves` in one call.
    pub fn build(
        config: &BuildConfig,
        scratch_dir: &Path,
        output: &Path,
        band: ZoomBand,
        leaves: impl IntoIterator<Item = (i64, BBox)>,
    ) -> Result<PackedTree> {
        let mut builder = Self::new(config, scratch_dir, output, band)?;
        for (id, bbox) in leaves {
            builder.insert(id, bbox)?;
        }
        builder.finish()
    }

    #[inline] pub fn len(&self) -> u64 { self.count }
    #[inline] pub fn is_empty(&self) -> bool { self.count == 0 }

    /// Append one leaf. Objects without geometry cannot be indexed.
    pub fn insert(&mut self, id: i64, bbox: BBox) -> Result<()> {
        if bbox.is_empty() {
            return Err(Error::format(format!("object {id} has an empty bounding box")));
        }
        let mut entry = [0u8; ENTRY_LEN];
        let mut slot = &mut entry[..];
        slot.put_i64_le(id);
        wire::put_bbox(&mut slot, &bbox);
        self.writer.write_all(&entry)?;
        self.count += 1;
        Ok(())
    }

    /// Pack the scratch leaves into a balanced tree.
    pub fn finish(mut self) -> Result<PackedTree> {
        self.writer.flush()?;
        let entries = self.read_leaves()?;
        let leaf_count = entries.len() as u64;

        let nodes = ScratchFile::create(&self.dir, &self.nodes_name)?;
        let mut out = NodeWriter { writer: BufWriter::new(nodes.reopen()?), offset: 0, written: 0 };

        let mut level = Vec::new();
        let mut depth = 0u32;
        if !entries.is_empty() {
            for group in str_groups(entries, self.capacity, |e| e.bbox.center()) {
                level.push(out.write(&Node::leaf(group))?);
            }
            depth = 1;
            while level.len() > 1 {
                let parents = str_groups(level, self.capacity, |c| c.bbox.center())
                    .into_iter()
                    .map(|group| out.write(&Node::internal(group)))
                    .collect::<Result<Vec<_>>>()?;
                level = parents;
                depth += 1;
            }
        }
        out.writer.flush()?;
        let len = out.offset;
        let node_count = out.written;
        drop(out);

        tracing::debug!(band = %self.band, leaves = leaf_count, nodes = node_count, depth, "packed tree");

        // The leaf scratch file goes away with `self`.
        let file = nodes.reopen()?;
        Ok(PackedTree {
            _nodes: nodes,
            file,
            span: TreeSpan { base: 0, len, root: level.pop(), token: next_tree_token() },
            node_count,
            leaf_count,
        })
    }

    fn read_leaves(&self) -> Result<Vec<LeafEntry>> {
        let bytes = self.count * ENTRY_LEN as u64;
        let mut reader = BufReader::new(self.leaves.reopen()?);
        let mut buf = Vec::with_capacity(bytes as usize);
        reader.read_to_end(&mut buf)?;
        if buf.len() as u64 != bytes {
            return Err(Error::format(format!(
                "leaf scratch holds {} bytes, expected {bytes}", buf.len()
            )));
        }
        let mut cursor = buf.as_slice();
        (0..self.count)
            .map(|_| -> Result<LeafEntry> {
                Ok(LeafEntry {
                    id: wire::get_i64(&mut cursor, "leaf id")?,
                    bbox: wire::get_bbox(&mut cursor, "leaf bbox")?,
                })
            })
            .collect()
    }
}

struct NodeWriter {
    writer: BufWriter<File>,
    offset: u64,
    written: u32,
}

impl NodeWriter {
    fn write(&mut self, node: &Node) -> Result<ChildRef> {
        let mut buf = Vec::with_capacity(node.encoded_len());
        node.encode(&mut buf);
        self.writer.write_all(&buf)?;
        let child = ChildRef { offset: self.offset, bbox: *node.bbox() };
        self.offset += buf.len() as u64;
        self.written += 1;
        Ok(child)
    }
}

/// Sort-tile-recursive grouping: slice by center x, then chunk each slice by center y.
/// Sorts are stable so equal input always yields equal groups.
fn str_groups<T>(mut items: Vec<T>, capacity: usize, center: impl Fn(&T) -> crate::geom::TilePoint) -> Vec<Vec<T>> {
    let pages = items.len().div_ceil(capacity);
    let slices = (pages as f64).sqrt().ceil().max(1.0) as usize;
    let slice_len = slices * capacity;

    items.sort_by_key(|item| center(item).x);
    let mut groups = Vec::with_capacity(pages);
    let mut rest = items;
    while !rest.is_empty() {
        let tail = rest.split_off(rest.len().min(slice_len));
        let mut slice = std::mem::replace(&mut rest, tail);
        slice.sort_by_key(|item| center(item).y);
        let mut slice = slice.into_iter().peekable();
        while slice.peek().is_some() {
            groups.push(slice.by_ref().take(capacity).collect());
        }
    }
    groups
}

/// What `PackedTree::write_to` put into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenTree {
    pub node_count: u32,
    /// Empty for an empty tree.
    pub root_bbox: BBox,
    pub byte_len: u64,
    /// Leaf ids in the order a reader walking the output tree visits them.
    pub leaf_order: Vec<i64>,
}

/// A finished tree, still held in its scratch file.
#[derive(Debug)]
pub struct PackedTree {
    _nodes: ScratchFile,
    file: File,
    span: TreeSpan,
    node_count: u32,
    leaf_count: u64,
}

impl PackedTree {
    #[inline] pub fn node_count(&self) -> u32 { self.node_count }
    #[inline] pub fn leaf_count(&self) -> u64 { self.leaf_count }
    #[inline] pub fn is_empty(&self) -> bool { self.span.root.is_none() }
    /// Size of the tree block, identical before and after `write_to`.
    #[inline] pub fn byte_len(&self) -> u64 { self.span.len }

    /// Root offset and box inside the scratch file.
    #[inline] pub fn root(&self) -> Option<ChildRef> { self.span.root }

    /// Ids whose box intersects `bbox`. No false negatives; false positives are possible.
    pub fn range_query(&mut self, bbox: &BBox, cache: &mut NodeCache) -> Result<Vec<i64>> {
        reader::range_query(&mut self.file, &self.span, bbox, cache)
    }

    /// Rewrite the tree top-down, breadth first, with the root at relative offset 0.
    ///
    /// The first pass lays out every node's final offset; the second remaps child offsets and
    /// writes. Nodes are read back from the scratch file each pass, never held all at once.
    pub fn write_to<W: Write>(&mut self, out: &mut W) -> Result<WrittenTree> {
        let Some(root) = self.span.root else {
            return Ok(WrittenTree { node_count: 0, root_bbox: BBox::empty(), byte_len: 0, leaf_order: Vec::new() });
        };
        let (base, len) = (self.span.base, self.span.len);

        let mut order = Vec::with_capacity(self.node_count as usize);
        let mut remap = AHashMap::with_capacity(self.node_count as usize);
        let mut next = 0u64;
        let mut queue = VecDeque::from([root.offset]);
        while let Some(offset) = queue.pop_front() {
            let node = read_node_at(&mut self.file, base, len, offset)?;
            remap.insert(offset, next);
            next += node.encoded_len() as u64;
            order.push(offset);
            if let Node::Internal { children, .. } = &node {
                queue.extend(children.iter().map(|c| c.offset));
            }
        }

        let mut leaf_order = Vec::with_capacity(self.leaf_count as usize);
        let mut buf = Vec::new();
        for &offset in &order {
            let node = match read_node_at(&mut self.file, base, len, offset)? {
                Node::Internal { bbox, children } => Node::Internal {
                    bbox,
                    children: children
                        .into_iter()
                        .map(|c| -> Result<ChildRef> {
                            let offset = remap.get(&c.offset).copied()
                                .ok_or_else(|| Error::format(format!("dangling child offset {}", c.offset)))?;
                            Ok(ChildRef { offset, bbox: c.bbox })
                        })
                        .collect::<Result<_>>()?,
                },
                leaf @ Node::Leaf { .. } => leaf,
            };
            if let Node::Leaf { entries, .. } = &node {
                leaf_order.extend(entries.iter().map(|e| e.id));
            }
            buf.clear();
            node.encode(&mut buf);
            out.write_all(&buf)?;
        }

        Ok(WrittenTree {
            node_count: order.len() as u32,
            root_bbox: root.bbox,
            byte_len: next,
            leaf_order,
        })
    }
}
