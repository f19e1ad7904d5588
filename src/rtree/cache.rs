use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;

use crate::rtree::Node;

static NEXT_TREE_TOKEN: AtomicU64 = AtomicU64::new(1);

/// A fresh identity for a tree whose pages may be cached.
pub(crate) fn next_tree_token() -> u64 {
    NEXT_TREE_TOKEN.fetch_add(1, Ordering::Relaxed)
}

/// LRU cache of decoded tree pages, keyed by offset.
///
/// A cache serves one tree at a time. Handing it to a different tree clears it, so pages of an
/// unrelated build are never returned. Create one per build or per worker; it is not shared.
#[derive(Debug)]
pub struct NodeCache {
    nodes: LruCache<u64, Arc<Node>>,
    owner: Option<u64>,
    hits: u64,
    misses: u64,
}

impl NodeCache {
    /// A cache holding at most `capacity` nodes (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { nodes: LruCache::new(capacity), owner: None, hits: 0, misses: 0 }
    }

    /// Drop every cached page and forget which tree they belonged to.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.owner = None;
    }

    #[inline] pub fn len(&self) -> usize { self.nodes.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
    #[inline] pub fn hits(&self) -> u64 { self.hits }
    #[inline] pub fn misses(&self) -> u64 { self.misses }

    /// Point the cache at tree `token`, invalidating pages of any other tree.
    pub(crate) fn bind(&mut self, token: u64) {
        if self.owner != Some(token) {
            if !self.nodes.is_empty() {
                tracing::trace!(old = ?self.owner, new = token, pages = self.nodes.len(), "node cache rebound");
            }
            self.nodes.clear();
            self.owner = Some(token);
        }
    }

    pub(crate) fn get(&mut self, offset: u64) -> Option<Arc<Node>> {
        let node = self.nodes.get(&offset).cloned();
        if node.is_some() { self.hits += 1 } else { self.misses += 1 }
        node
    }

    pub(crate) fn put(&mut self, offset: u64, node: Arc<Node>) {
        self.nodes.put(offset, node);
    }
}
