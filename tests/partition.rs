mod common;

use std::fs;

use common::{at_secs, band};
use mapdelta::region::{BoundaryIndex, PolygonRegions, RegionBoundary};
use mapdelta::{decode, encode, partition, split_file, BuildConfig, Container, Error, MapObject, SnapshotIndex, TilePoint};

/// Two overlapping lon/lat squares straddling the prime meridian, plus one far away.
const REGIONS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"name": "west", "category": "country"},
     "geometry": {"type": "Polygon", "coordinates": [[[-10, 0], [1, 0], [1, 10], [-10, 10], [-10, 0]]]}},
    {"type": "Feature", "properties": {"name": "east", "category": "country"},
     "geometry": {"type": "MultiPolygon", "coordinates": [[[[0, 0], [10, 0], [10, 10], [0, 10]]]]}},
    {"type": "Feature", "properties": {"name": "islands", "category": "country"},
     "geometry": {"type": "Polygon", "coordinates": [[[100, 50], [110, 50], [110, 60], [100, 60], [100, 50]]]}}
  ]
}"#;

fn regions(dir: &std::path::Path) -> PolygonRegions {
    let path = dir.join("regions.geojson");
    fs::write(&path, REGIONS).unwrap();
    PolygonRegions::from_geojson_path(&path).unwrap()
}

fn at(lat: f64, lon: f64) -> TilePoint { TilePoint::from_lat_lon(lat, lon).unwrap() }

/// Objects at: deep west, the overlap, deep east, mid-Atlantic (no region).
fn world() -> Container {
    let mut c = Container::new(at_secs(42));
    let code = c.dictionary.code_for("place", "village");
    c.insert_band(SnapshotIndex::from_objects(band(), [
        MapObject::new(1, vec![at(5.0, -5.0)], [code]),
        MapObject::new(2, vec![at(5.0, 0.5), at(5.0, 50.0)], [code]),
        MapObject::new(3, vec![at(5.0, 5.0)], [code]),
        MapObject::new(4, vec![at(-30.0, -30.0)], [code]),
    ]));
    c
}

#[test]
fn objects_go_to_every_region_containing_their_first_point() {
    let dir = tempfile::tempdir().unwrap();
    let regions = regions(dir.path());
    assert_eq!(regions.len(), 3);

    let global = world();
    let parts = partition(global.band(band()).unwrap(), &regions);
    assert_eq!(parts.keys().map(String::as_str).collect::<Vec<_>>(), ["east", "west"]);
    assert_eq!(parts["west"].ids().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(parts["east"].ids().collect::<Vec<_>>(), vec![2, 3]);
}

#[test]
fn every_placed_object_is_contained_and_nothing_is_invented() {
    let dir = tempfile::tempdir().unwrap();
    let regions = regions(dir.path());
    let global = world();
    let index = global.band(band()).unwrap();

    let parts = partition(index, &regions);
    for (name, part) in &parts {
        let region = regions.iter().find(|r| r.name() == name).unwrap();
        for obj in part.iter() {
            assert_eq!(index.get(obj.id()), Some(obj));
            assert!(region.contains(obj.reference_point().unwrap()));
        }
    }
    for obj in index.iter() {
        let p = obj.reference_point().unwrap();
        let expected = regions.query(p).into_iter().filter(|r| r.contains(p)).count();
        let placed = parts.values().filter(|part| part.contains(obj.id())).count();
        assert_eq!(placed, expected, "object {}", obj.id());
    }
}

#[test]
fn split_writes_one_container_per_region() {
    let dir = tempfile::tempdir().unwrap();
    let regions = regions(dir.path());
    let input = dir.path().join("world.mdlt");
    let global = world();
    encode(&input, &global, &BuildConfig::default()).unwrap();

    let out_dir = dir.path().join("regions");
    let mut written = split_file(&input, &regions, &out_dir, &BuildConfig::default()).unwrap();
    written.sort();
    assert_eq!(written, vec![out_dir.join("east.mdlt"), out_dir.join("west.mdlt")]);

    let west = decode(&out_dir.join("west.mdlt")).unwrap();
    assert_eq!(west.created, global.created);
    assert_eq!(west.band(band()).unwrap().ids().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 2);
}

#[test]
fn malformed_boundaries_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.geojson");
    fs::write(&path, r#"{"type": "FeatureCollection", "features": [{"type": "Feature", "properties": {},
        "geometry": {"type": "Point", "coordinates": [0, 0]}}]}"#).unwrap();
    assert!(matches!(PolygonRegions::from_geojson_path(&path), Err(Error::Format(_))));
}
