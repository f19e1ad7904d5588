use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::error::Result;
use crate::geom::BBox;
use crate::object::{DeltaRecord, EncodingDictionary, MapObject};
use crate::snapshot::{Container, SnapshotIndex, ZoomBand};

/// One side of a diff: an index and the dictionary its codes refer to.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotView<'a> {
    pub index: &'a SnapshotIndex,
    pub dictionary: &'a EncodingDictionary,
}

impl<'a> SnapshotView<'a> {
    pub fn new(index: &'a SnapshotIndex, dictionary: &'a EncodingDictionary) -> Self {
        Self { index, dictionary }
    }
}

/// Changes between two snapshots of the same band inside `region`.
///
/// `region` is first grown to the tile grid at `reference_zoom`. Every id found in both
/// restricted snapshots whose content differs yields a `Tombstone` carrying `before`'s object;
/// codes are compared through each side's own dictionary.
///
/// Ids found only in `after` are new content and need no record. Ids found only in `before`
/// also yield nothing: removals are not detected here.
pub fn compute_delta(
    before: SnapshotView<'_>,
    after: SnapshotView<'_>,
    region: &BBox,
    reference_zoom: u8,
) -> Result<Vec<DeltaRecord>> {
    let area = region.snap_to_zoom(reference_zoom)?;
    let old = before.index.query(&area);
    let new = after.index.query(&area);

    // Both lists are in ascending id order.
    let mut deltas = Vec::new();
    let (mut i, mut j) = (0, 0);
    let mut shared = 0usize;
    while i < old.len() && j < new.len() {
        match old[i].id().cmp(&new[j].id()) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                shared += 1;
                if !old[i].semantic_eq(before.dictionary, new[j], after.dictionary) {
                    deltas.push(DeltaRecord::Tombstone(old[i].clone()));
                }
                i += 1;
                j += 1;
            }
        }
    }

    tracing::debug!(
        band = %before.index.band(),
        before = old.len(),
        after = new.len(),
        shared,
        changed = deltas.len(),
        "computed delta"
    );
    Ok(deltas)
}

/// Materialize deltas into a snapshot whose codes refer to `target`.
///
/// Tombstones become records tagged only with the deletion marker; upserts are carried over
/// with their codes translated from `source`.
pub fn delta_to_index(
    band: ZoomBand,
    deltas: impl IntoIterator<Item = DeltaRecord>,
    source: &EncodingDictionary,
    target: &mut EncodingDictionary,
) -> Result<SnapshotIndex> {
    let mut index = SnapshotIndex::new(band);
    for delta in deltas {
        let obj: MapObject = match delta {
            DeltaRecord::Tombstone(obj) => obj.to_tombstone(target.deletion_code()),
            DeltaRecord::Upsert(obj) => obj.translate(source, target)?,
        };
        index.insert(obj);
    }
    Ok(index)
}

/// Diff every band present in either container. The result carries `after`'s timestamp.
pub fn diff_containers(before: &Container, after: &Container, region: &BBox, reference_zoom: u8) -> Result<Container> {
    let mut out = Container::new(after.created);
    let bands: BTreeSet<ZoomBand> = before.bands.keys().chain(after.bands.keys()).copied().collect();
    for band in bands {
        let empty = SnapshotIndex::new(band);
        let old = before.band(band).unwrap_or(&empty);
        let new = after.band(band).unwrap_or(&empty);
        let deltas = compute_delta(
            SnapshotView::new(old, &before.dictionary),
            SnapshotView::new(new, &after.dictionary),
            region,
            reference_zoom,
        )?;
        let index = delta_to_index(band, deltas, &before.dictionary, &mut out.dictionary)?;
        out.insert_band(index);
    }
    tracing::info!(bands = out.bands.len(), tombstones = out.object_count(), "diffed containers");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::TilePoint;

    fn band() -> ZoomBand { ZoomBand::new(0, 31).unwrap() }

    fn at(id: i64, x: u32, y: u32, code: u32) -> MapObject {
        MapObject::new(id, vec![TilePoint::new(x, y)], [code])
    }

    #[test]
    fn only_changed_shared_ids_are_tombstoned() {
        let mut da = EncodingDictionary::new();
        let primary = da.code_for("highway", "primary");
        let mut db = EncodingDictionary::new();
        let secondary = db.code_for("highway", "secondary");
        let primary_b = db.code_for("highway", "primary");

        let a = SnapshotIndex::from_objects(band(), [at(1, 10, 10, primary), at(2, 20, 20, primary), at(3, 30, 30, primary)]);
        let b = SnapshotIndex::from_objects(band(), [at(1, 10, 10, primary_b), at(2, 20, 20, secondary), at(4, 40, 40, secondary)]);

        let deltas = compute_delta(SnapshotView::new(&a, &da), SnapshotView::new(&b, &db), &BBox::WORLD, 15).unwrap();
        assert_eq!(deltas, vec![DeltaRecord::Tombstone(at(2, 20, 20, primary))]);
    }

    #[test]
    fn region_limits_the_comparison() {
        let mut dict = EncodingDictionary::new();
        let (x, y) = (dict.code_for("k", "x"), dict.code_for("k", "y"));
        let far = 1 << 30;
        let a = SnapshotIndex::from_objects(band(), [at(1, 10, 10, x), at(2, far, far, x)]);
        let b = SnapshotIndex::from_objects(band(), [at(1, 10, 10, y), at(2, far, far, y)]);

        let region = BBox::new(0, 0, 100, 100);
        let deltas = compute_delta(SnapshotView::new(&a, &dict), SnapshotView::new(&b, &dict), &region, 15).unwrap();
        assert_eq!(deltas.iter().map(DeltaRecord::id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn snapping_widens_the_region_to_whole_tiles() {
        let mut dict = EncodingDictionary::new();
        let (x, y) = (dict.code_for("k", "x"), dict.code_for("k", "y"));
        // Tiles at zoom 15 are 2^16 units wide; (500, 500) shares the tile of the region.
        let a = SnapshotIndex::from_objects(band(), [at(1, 500, 500, x)]);
        let b = SnapshotIndex::from_objects(band(), [at(1, 500, 500, y)]);
        let region = BBox::new(0, 0, 10, 10);
        let (va, vb) = (SnapshotView::new(&a, &dict), SnapshotView::new(&b, &dict));
        assert_eq!(compute_delta(va, vb, &region, 15).unwrap().len(), 1);
        assert!(compute_delta(va, vb, &region, 31).unwrap().is_empty());
    }

    #[test]
    fn delta_index_tags_tombstones_in_target_dictionary() {
        let mut source = EncodingDictionary::new();
        let road = source.code_for("highway", "primary");
        let name = source.code_for("name", "");
        let obj = at(7, 10, 10, road).with_names([(name, "A1".to_owned())]);

        let mut target = EncodingDictionary::new();
        let index = delta_to_index(band(), [DeltaRecord::Tombstone(obj)], &source, &mut target).unwrap();
        let tomb = index.get(7).unwrap();
        assert!(tomb.is_tombstone(&target));
        assert_eq!(tomb.types(), &[target.deletion_code()]);
        assert_eq!(tomb.points(), &[TilePoint::new(10, 10)]);
        assert!(tomb.names().is_empty());
    }
}
