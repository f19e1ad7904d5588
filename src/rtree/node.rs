use std::io::{Read, Seek, SeekFrom};

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};
use crate::geom::BBox;
use crate::io::wire::{self, BBOX_LEN};

const KIND_LEAF: u8 = 0;
const KIND_INTERNAL: u8 = 1;

/// `kind: u8 | count: u16 | bbox`
pub(crate) const NODE_HEADER_LEN: usize = 1 + 2 + BBOX_LEN;
/// `id: i64 | bbox` or `child offset: u64 | bbox`
pub(crate) const ENTRY_LEN: usize = 8 + BBOX_LEN;

/// One indexed object: id plus its bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafEntry {
    pub id: i64,
    pub bbox: BBox,
}

/// Reference to a child node by byte offset, with the child's box so queries can prune
/// without reading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildRef {
    pub offset: u64,
    pub bbox: BBox,
}

/// A tree page. Nodes never hold pointers to each other, only offsets into the tree block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf { bbox: BBox, entries: Vec<LeafEntry> },
    Internal { bbox: BBox, children: Vec<ChildRef> },
}

impl Node {
    pub fn bbox(&self) -> &BBox {
        match self {
            Self::Leaf { bbox, .. } | Self::Internal { bbox, .. } => bbox,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Leaf { entries, .. } => entries.len(),
            Self::Internal { children, .. } => children.len(),
        }
    }

    #[inline] pub fn is_leaf(&self) -> bool { matches!(self, Self::Leaf { .. }) }

    pub(crate) fn encoded_len(&self) -> usize {
        NODE_HEADER_LEN + self.len() * ENTRY_LEN
    }

    pub(crate) fn encode<B: BufMut>(&self, buf: &mut B) {
        match self {
            Self::Leaf { bbox, entries } => {
                buf.put_u8(KIND_LEAF);
                buf.put_u16_le(entries.len() as u16);
                wire::put_bbox(buf, bbox);
                for entry in entries {
                    buf.put_i64_le(entry.id);
                    wire::put_bbox(buf, &entry.bbox);
                }
            }
            Self::Internal { bbox, children } => {
                buf.put_u8(KIND_INTERNAL);
                buf.put_u16_le(children.len() as u16);
                wire::put_bbox(buf, bbox);
                for child in children {
                    buf.put_u64_le(child.offset);
                    wire::put_bbox(buf, &child.bbox);
                }
            }
        }
    }

    pub(crate) fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let kind = wire::get_u8(buf, "node kind")?;
        let count = wire::get_u16(buf, "node entry count")? as usize;
        let bbox = wire::get_bbox(buf, "node bbox")?;
        wire::need(buf, count * ENTRY_LEN, "node entries")?;
        match kind {
            KIND_LEAF => Ok(Self::Leaf {
                bbox,
                entries: (0..count)
                    .map(|_| -> Result<LeafEntry> {
                        Ok(LeafEntry { id: buf.get_i64_le(), bbox: wire::get_bbox(buf, "leaf bbox")? })
                    })
                    .collect::<Result<_>>()?,
            }),
            KIND_INTERNAL => Ok(Self::Internal {
                bbox,
                children: (0..count)
                    .map(|_| -> Result<ChildRef> {
                        Ok(ChildRef { offset: buf.get_u64_le(), bbox: wire::get_bbox(buf, "child bbox")? })
                    })
                    .collect::<Result<_>>()?,
            }),
            other => Err(Error::format(format!("unknown node kind {other}"))),
        }
    }

    /// Build a leaf whose box is the union of its entries.
    pub(crate) fn leaf(entries: Vec<LeafEntry>) -> Self {
        let bbox = entries.iter().fold(BBox::empty(), |acc, e| acc.union(&e.bbox));
        Self::Leaf { bbox, entries }
    }

    pub(crate) fn internal(children: Vec<ChildRef>) -> Self {
        let bbox = children.iter().fold(BBox::empty(), |acc, c| acc.union(&c.bbox));
        Self::Internal { bbox, children }
    }
}

/// Read the node at `offset` (relative to `base`) of a tree block `limit` bytes long.
pub(crate) fn read_node_at<R: Read + Seek>(reader: &mut R, base: u64, limit: u64, offset: u64) -> Result<Node> {
    let header_end = offset.checked_add(NODE_HEADER_LEN as u64)
        .filter(|&end| end <= limit)
        .ok_or_else(|| Error::format(format!("node offset {offset} outside tree of {limit} bytes")))?;

    reader.seek(SeekFrom::Start(base + offset))?;
    let mut page = vec![0u8; NODE_HEADER_LEN];
    read_page(reader, &mut page)?;
    let count = u16::from_le_bytes([page[1], page[2]]) as usize;
    let body = (count * ENTRY_LEN) as u64;
    if header_end + body > limit {
        return Err(Error::format(format!("node at {offset} overruns tree of {limit} bytes")));
    }
    page.resize(NODE_HEADER_LEN + count * ENTRY_LEN, 0);
    read_page(reader, &mut page[NODE_HEADER_LEN..])?;
    Node::decode(&mut page.as_slice())
}

fn read_page<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => Error::format("truncated tree node"),
        _ => Error::Io(e),
    })
}
