#![allow(dead_code)]

use std::time::{Duration, UNIX_EPOCH};

use mapdelta::{Container, MapObject, SnapshotIndex, TilePoint, ZoomBand};

pub fn band() -> ZoomBand { ZoomBand::new(0, 14).unwrap() }

pub fn detail() -> ZoomBand { ZoomBand::new(15, 20).unwrap() }

pub fn at_secs(secs: u64) -> std::time::SystemTime { UNIX_EPOCH + Duration::from_secs(secs) }

/// A point object tagged with one `k=v` tag from `c`'s dictionary.
pub fn tagged(c: &mut Container, id: i64, x: u32, y: u32, key: &str, value: &str) -> MapObject {
    let code = c.dictionary.code_for(key, value);
    MapObject::new(id, vec![TilePoint::new(x, y)], [code])
}

/// Resolved `(key, value)` tags of `id` in `band`.
pub fn tags_of(c: &Container, band: ZoomBand, id: i64) -> Vec<(String, String)> {
    c.band(band).unwrap().get(id).unwrap().types().iter()
        .map(|&code| c.dictionary.resolve(code).unwrap().clone())
        .collect()
}

/// A container holding `objects` in `band()`.
pub fn single_band(secs: u64, build: impl FnOnce(&mut Container) -> Vec<MapObject>) -> Container {
    let mut c = Container::new(at_secs(secs));
    let objects = build(&mut c);
    c.insert_band(SnapshotIndex::from_objects(band(), objects));
    c
}
