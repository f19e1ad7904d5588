//! Disk-backed packed R-tree: built in two phases over scratch files, repacked top-down into a
//! container section, queried through an explicit `NodeCache`.

mod builder;
mod cache;
pub(crate) mod node;
pub(crate) mod reader;

pub use builder::{PackedTree, RTreeBuilder, WrittenTree};
pub use cache::NodeCache;
pub(crate) use cache::next_tree_token;
pub use node::{ChildRef, LeafEntry, Node};
pub use reader::StoredTree;
