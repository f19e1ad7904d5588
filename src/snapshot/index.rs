use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use rstar::RTree;

use crate::geom::{BBox, IndexedBox};
use crate::object::MapObject;
use crate::snapshot::ZoomBand;

/// Id-keyed, spatially queryable objects of one zoom band.
///
/// Ids are unique. Inserting an id that is already present replaces the old object
/// (last insert wins); this is how duplicates in the input are resolved and is never an error.
#[derive(Clone)]
pub struct SnapshotIndex {
    band: ZoomBand,
    objects: BTreeMap<i64, MapObject>,
    // Built on first query, dropped on mutation.
    rtree: OnceLock<RTree<IndexedBox>>,
}

impl SnapshotIndex {
    pub fn new(band: ZoomBand) -> Self {
        Self { band, objects: BTreeMap::new(), rtree: OnceLock::new() }
    }

    /// Build from objects in order; later objects replace earlier ones with the same id.
    pub fn from_objects(band: ZoomBand, objects: impl IntoIterator<Item = MapObject>) -> Self {
        let mut index = Self::new(band);
        index.extend(objects);
        index
    }

    #[inline] pub fn band(&self) -> ZoomBand { self.band }
    #[inline] pub fn len(&self) -> usize { self.objects.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.objects.is_empty() }
    #[inline] pub fn get(&self, id: i64) -> Option<&MapObject> { self.objects.get(&id) }
    #[inline] pub fn contains(&self, id: i64) -> bool { self.objects.contains_key(&id) }

    /// Insert or replace; returns the displaced object.
    pub fn insert(&mut self, obj: MapObject) -> Option<MapObject> {
        self.rtree.take();
        self.objects.insert(obj.id(), obj)
    }

    pub fn remove(&mut self, id: i64) -> Option<MapObject> {
        self.rtree.take();
        self.objects.remove(&id)
    }

    pub fn extend(&mut self, objects: impl IntoIterator<Item = MapObject>) {
        self.rtree.take();
        for obj in objects {
            self.objects.insert(obj.id(), obj);
        }
    }

    /// Objects in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &MapObject> { self.objects.values() }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ { self.objects.keys().copied() }

    pub fn into_objects(self) -> impl Iterator<Item = MapObject> { self.objects.into_values() }

    /// Bounding box of every object.
    pub fn bounds(&self) -> BBox {
        self.objects.values().fold(BBox::empty(), |acc, obj| acc.union(&obj.bbox()))
    }

    fn rtree(&self) -> &RTree<IndexedBox> {
        self.rtree.get_or_init(|| {
            RTree::bulk_load(
                self.objects.values()
                    .map(|obj| IndexedBox::new(obj.id(), obj.bbox()))
                    .filter(|entry| !entry.bbox().is_empty())
                    .collect(),
            )
        })
    }

    /// Objects whose bounding box intersects `bbox`, in ascending id order.
    pub fn query(&self, bbox: &BBox) -> Vec<&MapObject> {
        if bbox.is_empty() {
            return Vec::new();
        }
        let mut ids = self.rtree()
            .locate_in_envelope_intersecting(&bbox.envelope())
            .map(IndexedBox::id)
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids.into_iter().filter_map(|id| self.objects.get(&id)).collect()
    }

    /// A copy holding only the objects that intersect `bbox`.
    pub fn restrict(&self, bbox: &BBox) -> Self {
        Self::from_objects(self.band, self.query(bbox).into_iter().cloned())
    }
}

impl PartialEq for SnapshotIndex {
    fn eq(&self, other: &Self) -> bool {
        self.band == other.band && self.objects == other.objects
    }
}

impl Eq for SnapshotIndex {}

impl fmt::Debug for SnapshotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotIndex")
            .field("band", &self.band)
            .field("objects", &self.objects.len())
            .finish()
    }
}
