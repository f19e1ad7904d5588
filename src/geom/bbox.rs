use rstar::{RTreeObject, AABB};

use crate::error::{Error, Result};
use crate::geom::tile::{TilePoint, MAX_TILE_COORD, TILE_BITS};

/// Inclusive axis-aligned box in tile space. Empty when `min > max` on either axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BBox {
    /// The whole tile grid.
    pub const WORLD: Self = Self { min_x: 0, min_y: 0, max_x: MAX_TILE_COORD, max_y: MAX_TILE_COORD };

    #[inline]
    pub const fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// The identity for `union`.
    #[inline]
    pub const fn empty() -> Self {
        Self { min_x: u32::MAX, min_y: u32::MAX, max_x: 0, max_y: 0 }
    }

    #[inline]
    pub const fn from_point(p: TilePoint) -> Self {
        Self { min_x: p.x, min_y: p.y, max_x: p.x, max_y: p.y }
    }

    /// The tile-space box covering a lon/lat rectangle.
    pub fn from_lon_lat(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        // Tile y grows southward.
        let nw = TilePoint::from_lat_lon(max_lat, min_lon)?;
        let se = TilePoint::from_lat_lon(min_lat, max_lon)?;
        Ok(Self::from_points(&[nw, se]))
    }

    /// Smallest box covering every point; empty for no points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a TilePoint>) -> Self {
        points.into_iter().fold(Self::empty(), |mut bbox, p| {
            bbox.expand_to_point(*p);
            bbox
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool { self.min_x > self.max_x || self.min_y > self.max_y }

    pub fn expand_to_point(&mut self, p: TilePoint) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() { return *other }
        if other.is_empty() { return *self }
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let bbox = Self {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        };
        (!bbox.is_empty()).then_some(bbox)
    }

    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty() && !other.is_empty()
            && self.min_x <= other.max_x && other.min_x <= self.max_x
            && self.min_y <= other.max_y && other.min_y <= self.max_y
    }

    #[inline]
    pub fn contains_point(&self, p: TilePoint) -> bool {
        self.min_x <= p.x && p.x <= self.max_x && self.min_y <= p.y && p.y <= self.max_y
    }

    /// True if `other` lies entirely inside `self`. Every box contains the empty box.
    pub fn contains_box(&self, other: &Self) -> bool {
        other.is_empty() || (!self.is_empty()
            && self.min_x <= other.min_x && other.max_x <= self.max_x
            && self.min_y <= other.min_y && other.max_y <= self.max_y)
    }

    /// Center point, rounded down. Used as the STR sort key.
    #[inline]
    pub fn center(&self) -> TilePoint {
        TilePoint::new(
            ((self.min_x as u64 + self.max_x as u64) / 2) as u32,
            ((self.min_y as u64 + self.max_y as u64) / 2) as u32,
        )
    }

    /// Grow outward to the boundaries of the tiles it touches at `zoom`.
    pub fn snap_to_zoom(&self, zoom: u8) -> Result<Self> {
        if zoom > TILE_BITS {
            return Err(Error::InvalidZoom(zoom));
        }
        if self.is_empty() {
            return Ok(*self);
        }
        let shift = (TILE_BITS - zoom) as u32;
        let mask = (1u64 << shift) - 1;
        let floor = |v: u32| ((v as u64) & !mask) as u32;
        let ceil = |v: u32| ((v as u64 | mask).min(MAX_TILE_COORD as u64)) as u32;
        Ok(Self {
            min_x: floor(self.min_x),
            min_y: floor(self.min_y),
            max_x: ceil(self.max_x),
            max_y: ceil(self.max_y),
        })
    }

    #[inline]
    pub(crate) fn envelope(&self) -> AABB<[i64; 2]> {
        AABB::from_corners(
            [self.min_x as i64, self.min_y as i64],
            [self.max_x as i64, self.max_y as i64],
        )
    }
}

/// A bounding box in an R-tree, associated with an object id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct IndexedBox {
    id: i64,
    bbox: BBox,
}

impl IndexedBox {
    pub(crate) fn new(id: i64, bbox: BBox) -> Self {
        Self { id, bbox }
    }

    /// Get the id of the corresponding object.
    pub(crate) fn id(&self) -> i64 { self.id }

    /// Get a reference to the bounding box.
    pub(crate) fn bbox(&self) -> &BBox { &self.bbox }
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bbox.envelope()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_with_empty_is_identity() {
        let b = BBox::new(1, 2, 3, 4);
        assert_eq!(b.union(&BBox::empty()), b);
        assert_eq!(BBox::empty().union(&b), b);
    }

    #[test]
    fn intersection_of_disjoint_is_none() {
        let a = BBox::new(0, 0, 10, 10);
        let b = BBox::new(11, 0, 20, 10);
        assert!(a.intersection(&b).is_none());
        assert!(!a.intersects(&b));
    }

    #[test]
    fn touching_edges_intersect() {
        let a = BBox::new(0, 0, 10, 10);
        let b = BBox::new(10, 10, 20, 20);
        assert!(a.intersects(&b));
        assert_eq!(a.intersection(&b), Some(BBox::new(10, 10, 10, 10)));
    }

    #[test]
    fn containment() {
        let outer = BBox::new(0, 0, 100, 100);
        assert!(outer.contains_box(&BBox::new(10, 10, 20, 20)));
        assert!(!outer.contains_box(&BBox::new(10, 10, 200, 20)));
        assert!(outer.contains_point(TilePoint::new(100, 0)));
        assert!(!outer.contains_point(TilePoint::new(101, 0)));
    }

    #[test]
    fn from_points_covers_all() {
        let pts = [TilePoint::new(5, 9), TilePoint::new(1, 20), TilePoint::new(7, 3)];
        assert_eq!(BBox::from_points(&pts), BBox::new(1, 3, 7, 20));
        assert!(BBox::from_points(&[]).is_empty());
    }

    #[test]
    fn lon_lat_bounds_cover_both_corners() {
        let b = BBox::from_lon_lat(-1.0, 50.0, 2.0, 52.0).unwrap();
        assert!(b.contains_point(TilePoint::from_lat_lon(51.0, 0.5).unwrap()));
        assert!(!b.contains_point(TilePoint::from_lat_lon(49.0, 0.5).unwrap()));
        assert!(BBox::from_lon_lat(0.0, 0.0, 200.0, 1.0).is_err());
    }

    #[test]
    fn snap_expands_to_tile_grid() {
        // zoom 29 -> tiles of 4 units
        let snapped = BBox::new(5, 6, 9, 12).snap_to_zoom(29).unwrap();
        assert_eq!(snapped, BBox::new(4, 4, 11, 15));
        assert_eq!(BBox::new(5, 6, 9, 12).snap_to_zoom(0).unwrap(), BBox::WORLD);
        assert_eq!(BBox::new(5, 6, 9, 12).snap_to_zoom(31).unwrap(), BBox::new(5, 6, 9, 12));
    }
}
