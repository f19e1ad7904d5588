mod common;

use std::path::Path;

use common::{at_secs, band, detail};
use mapdelta::rtree::{NodeCache, PackedTree, RTreeBuilder};
use mapdelta::{encode, query_file, BBox, BuildConfig, Container, ContainerReader, MapObject, SnapshotIndex, TilePoint};
use proptest::prelude::*;

fn build(dir: &Path, capacity: usize, leaves: &[(i64, BBox)]) -> PackedTree {
    let config = BuildConfig { node_capacity: capacity, ..BuildConfig::default() };
    RTreeBuilder::build(&config, dir, &dir.join("t.mdlt"), band(), leaves.iter().copied()).unwrap()
}

/// Boxes with ids `0..n`, laid out on a coarse grid so some overlap.
fn grid(n: i64) -> Vec<(i64, BBox)> {
    (0..n)
        .map(|i| {
            let (x, y) = ((i % 13) as u32 * 100, (i / 13) as u32 * 100);
            (i, BBox::new(x, y, x + 150, y + 40))
        })
        .collect()
}

fn arb_box() -> impl Strategy<Value = BBox> {
    (0u32..10_000, 0u32..10_000, 0u32..500, 0u32..500)
        .prop_map(|(x, y, w, h)| BBox::new(x, y, x + w, y + h))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn query_matches_a_linear_scan(
        boxes in prop::collection::vec(arb_box(), 0..300),
        capacity in 2usize..12,
        query in arb_box(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let leaves: Vec<(i64, BBox)> = boxes.into_iter().enumerate().map(|(i, b)| (i as i64, b)).collect();
        let mut tree = build(dir.path(), capacity, &leaves);
        let mut cache = NodeCache::new(16);

        for &(id, bbox) in &leaves {
            prop_assert!(tree.range_query(&bbox, &mut cache).unwrap().contains(&id));
        }

        let mut got = tree.range_query(&query, &mut cache).unwrap();
        got.sort_unstable();
        let want: Vec<i64> = leaves.iter().filter(|(_, b)| b.intersects(&query)).map(|&(id, _)| id).collect();
        prop_assert_eq!(got, want);
    }
}

#[test]
fn disjoint_query_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut tree = build(dir.path(), 4, &grid(100));
    let mut cache = NodeCache::new(8);
    assert!(tree.range_query(&BBox::new(1 << 20, 1 << 20, 1 << 21, 1 << 21), &mut cache).unwrap().is_empty());
}

#[test]
fn shared_cache_never_mixes_trees() {
    let dir = tempfile::tempdir().unwrap();
    let mut a = build(dir.path(), 4, &grid(60));
    let shifted: Vec<(i64, BBox)> = grid(60).into_iter().map(|(id, b)| (id + 1_000, b)).collect();
    let other = tempfile::tempdir().unwrap();
    let mut b = build(other.path(), 4, &shifted);
    // Same layout, so both trees have nodes at identical offsets.
    assert_eq!(a.byte_len(), b.byte_len());

    let mut cache = NodeCache::new(1024);
    let everything = BBox::WORLD;
    for _ in 0..3 {
        let from_a = a.range_query(&everything, &mut cache).unwrap();
        assert!(from_a.iter().all(|&id| id < 1_000));
        assert_eq!(from_a.len(), 60);
        let from_b = b.range_query(&everything, &mut cache).unwrap();
        assert!(from_b.iter().all(|&id| id >= 1_000));
        assert_eq!(from_b.len(), 60);
    }
}

/// A two-band container with ids chosen so each band's tree looks the same on disk.
fn two_band_container() -> Container {
    let mut c = Container::new(at_secs(1));
    let code = c.dictionary.code_for("building", "yes");
    let objects = |offset: i64| {
        grid(40).into_iter()
            .map(|(id, b)| MapObject::new(id + offset, vec![TilePoint::new(b.min_x, b.min_y), TilePoint::new(b.max_x, b.max_y)], [code]))
            .collect::<Vec<_>>()
    };
    c.insert_band(SnapshotIndex::from_objects(band(), objects(0)));
    c.insert_band(SnapshotIndex::from_objects(detail(), objects(500)));
    c
}

#[test]
fn stored_trees_share_a_cache_safely() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two.mdlt");
    encode(&path, &two_band_container(), &BuildConfig { node_capacity: 3, ..BuildConfig::default() }).unwrap();

    let reader = ContainerReader::open(&path).unwrap();
    let mut low = reader.tree(band()).unwrap().unwrap();
    let mut high = reader.tree(detail()).unwrap().unwrap();
    let mut cache = NodeCache::new(256);

    let q = BBox::new(0, 0, 250, 50);
    let mut l = low.range_query(&q, &mut cache).unwrap();
    let mut h = high.range_query(&q, &mut cache).unwrap();
    l.sort_unstable();
    h.sort_unstable();
    assert_eq!(h, l.iter().map(|id| id + 500).collect::<Vec<_>>());
    assert!(!l.is_empty());

    let mut ids = low.leaf_ids(&mut cache).unwrap();
    ids.sort_unstable();
    assert_eq!(ids, (0..40).collect::<Vec<_>>());
}

#[test]
fn query_file_answers_every_band() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two.mdlt");
    let c = two_band_container();
    encode(&path, &c, &BuildConfig::default()).unwrap();

    let q = BBox::new(0, 0, 120, 120);
    let hits = query_file(&path, &q, &BuildConfig { cache_nodes: 2, ..BuildConfig::default() }).unwrap();
    assert_eq!(hits.keys().copied().collect::<Vec<_>>(), vec![band(), detail()]);
    for (band, ids) in &hits {
        let want: Vec<i64> = c.band(*band).unwrap().query(&q).iter().map(|o| o.id()).collect();
        assert_eq!(ids, &want);
    }
}
