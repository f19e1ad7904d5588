//! Region boundaries used to split a global snapshot.

use std::path::Path;

use geo::{BoundingRect, Contains, MultiPolygon, Point};
use rstar::RTree;

use crate::error::{Error, PathContext, Result};
use crate::geom::{BBox, IndexedBox, TilePoint};
use crate::io::geojson;

/// A named area with an exact containment test.
pub trait RegionBoundary: Send + Sync {
    fn name(&self) -> &str;
    fn category(&self) -> &str;
    fn contains(&self, point: TilePoint) -> bool;
}

/// Candidate lookup over a set of regions. Candidates may be false positives; callers confirm
/// with `RegionBoundary::contains`.
pub trait BoundaryIndex: Send + Sync {
    fn query(&self, point: TilePoint) -> Vec<&dyn RegionBoundary>;
}

/// A region whose boundary is a lon/lat multipolygon.
#[derive(Debug, Clone)]
pub struct PolygonRegion {
    name: String,
    category: String,
    shape: MultiPolygon<f64>,
    bbox: BBox,
}

impl PolygonRegion {
    /// Fails if the shape is empty or has a vertex outside the projectable range.
    pub fn new(name: impl Into<String>, category: impl Into<String>, shape: MultiPolygon<f64>) -> Result<Self> {
        let name = name.into();
        let rect = shape.bounding_rect()
            .ok_or_else(|| Error::format(format!("region {name:?} has an empty boundary")))?;
        let bbox = BBox::from_lon_lat(rect.min().x, rect.min().y, rect.max().x, rect.max().y)?;
        Ok(Self { name, category: category.into(), shape, bbox })
    }

    #[inline] pub fn shape(&self) -> &MultiPolygon<f64> { &self.shape }

    /// Tile-space bounding box of the boundary.
    #[inline] pub fn bbox(&self) -> &BBox { &self.bbox }
}

impl RegionBoundary for PolygonRegion {
    fn name(&self) -> &str { &self.name }

    fn category(&self) -> &str { &self.category }

    fn contains(&self, point: TilePoint) -> bool {
        if !self.bbox.contains_point(point) {
            return false;
        }
        let (lat, lon) = point.to_lat_lon();
        self.shape.contains(&Point::new(lon, lat))
    }
}

/// A set of polygon regions with an R-tree over their bounding boxes.
#[derive(Debug, Clone)]
pub struct PolygonRegions {
    regions: Vec<PolygonRegion>,
    rtree: RTree<IndexedBox>,
}

impl PolygonRegions {
    pub fn new(regions: Vec<PolygonRegion>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                regions.iter().enumerate()
                    .map(|(i, region)| IndexedBox::new(i as i64, region.bbox))
                    .collect(),
            ),
            regions,
        }
    }

    /// Load regions from a GeoJSON FeatureCollection of Polygon/MultiPolygon features.
    pub fn from_geojson_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_path(path)?;
        let regions = geojson::read_regions_from_geojson_bytes(&bytes)?;
        tracing::info!(path = %path.display(), regions = regions.len(), "loaded region boundaries");
        Ok(Self::new(regions))
    }

    #[inline] pub fn len(&self) -> usize { self.regions.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.regions.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &PolygonRegion> { self.regions.iter() }
}

impl BoundaryIndex for PolygonRegions {
    /// Regions whose bounding box contains `point`, in load order.
    fn query(&self, point: TilePoint) -> Vec<&dyn RegionBoundary> {
        let mut hits = self.rtree
            .locate_in_envelope_intersecting(&BBox::from_point(point).envelope())
            .map(|entry| entry.id() as usize)
            .collect::<Vec<_>>();
        hits.sort_unstable();
        hits.into_iter()
            .filter_map(|i| self.regions.get(i))
            .map(|region| region as &dyn RegionBoundary)
            .collect()
    }
}
