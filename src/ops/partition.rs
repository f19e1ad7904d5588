use std::collections::BTreeMap;

use crate::region::BoundaryIndex;
use crate::snapshot::{Container, SnapshotIndex};

/// Split `global` by region.
///
/// Each object is placed by its first point: it goes into every region whose boundary contains
/// that point, so an object on an overlap lands in each overlapping region. Objects outside every
/// region are dropped, and regions that receive nothing are absent from the result.
pub fn partition(global: &SnapshotIndex, boundaries: &dyn BoundaryIndex) -> BTreeMap<String, SnapshotIndex> {
    let mut out: BTreeMap<String, SnapshotIndex> = BTreeMap::new();
    let mut dropped = 0usize;
    for obj in global.iter() {
        let Some(point) = obj.reference_point() else { continue };
        let mut placed = false;
        for region in boundaries.query(point) {
            if !region.contains(point) {
                continue;
            }
            placed = true;
            out.entry(region.name().to_owned())
                .or_insert_with(|| SnapshotIndex::new(global.band()))
                .insert(obj.clone());
        }
        if !placed {
            dropped += 1;
        }
    }
    tracing::debug!(band = %global.band(), regions = out.len(), dropped, "partitioned band");
    out
}

/// Split every band of `global`. Each region container shares `global`'s dictionary and timestamp.
pub fn partition_container(global: &Container, boundaries: &dyn BoundaryIndex) -> BTreeMap<String, Container> {
    let mut out: BTreeMap<String, Container> = BTreeMap::new();
    for index in global.bands.values() {
        for (name, part) in partition(index, boundaries) {
            out.entry(name)
                .or_insert_with(|| Container::new(global.created).with_dictionary(global.dictionary.clone()))
                .insert_band(part);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{BBox, TilePoint};
    use crate::object::MapObject;
    use crate::region::RegionBoundary;
    use crate::snapshot::ZoomBand;

    /// Axis-aligned test region in tile space.
    struct Rect(&'static str, BBox);

    impl RegionBoundary for Rect {
        fn name(&self) -> &str { self.0 }
        fn category(&self) -> &str { "test" }
        fn contains(&self, point: TilePoint) -> bool { self.1.contains_point(point) }
    }

    /// Returns every region as a candidate.
    struct Scan(Vec<Rect>);

    impl BoundaryIndex for Scan {
        fn query(&self, _: TilePoint) -> Vec<&dyn RegionBoundary> {
            self.0.iter().map(|r| r as &dyn RegionBoundary).collect()
        }
    }

    fn band() -> ZoomBand { ZoomBand::new(0, 31).unwrap() }

    #[test]
    fn places_by_first_point_into_every_containing_region() {
        let regions = Scan(vec![
            Rect("left", BBox::new(0, 0, 60, 100)),
            Rect("right", BBox::new(40, 0, 100, 100)),
            Rect("empty", BBox::new(500, 500, 600, 600)),
        ]);
        let global = SnapshotIndex::from_objects(band(), [
            MapObject::new(1, vec![TilePoint::new(10, 10)], [0]),
            // Starts in the overlap, ends far away: only the first point counts.
            MapObject::new(2, vec![TilePoint::new(50, 50), TilePoint::new(900, 900)], [0]),
            MapObject::new(3, vec![TilePoint::new(90, 10)], [0]),
            MapObject::new(4, vec![TilePoint::new(300, 300)], [0]),
        ]);

        let parts = partition(&global, &regions);
        assert_eq!(parts.keys().collect::<Vec<_>>(), ["left", "right"]);
        assert_eq!(parts["left"].ids().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(parts["right"].ids().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn region_containers_share_dictionary_and_time() {
        let regions = Scan(vec![Rect("all", BBox::WORLD)]);
        let mut global = Container::new(std::time::UNIX_EPOCH);
        let code = global.dictionary.code_for("place", "city");
        global.insert_band(SnapshotIndex::from_objects(band(), [MapObject::new(1, vec![TilePoint::new(1, 1)], [code])]));
        global.insert_band(SnapshotIndex::from_objects(ZoomBand::new(0, 5).unwrap(), [MapObject::new(2, vec![TilePoint::new(2, 2)], [code])]));

        let parts = partition_container(&global, &regions);
        let all = &parts["all"];
        assert_eq!(all.dictionary, global.dictionary);
        assert_eq!(all.created, global.created);
        assert_eq!(all.bands.len(), 2);
    }
}
