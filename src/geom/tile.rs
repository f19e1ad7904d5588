use std::f64::consts::PI;

use crate::error::{Error, Result};

/// Number of bits in a tile-space coordinate.
pub const TILE_BITS: u8 = 31;

/// Largest representable tile-space coordinate.
pub const MAX_TILE_COORD: u32 = (1u32 << TILE_BITS) - 1;

/// Northern/southern limit of the Web Mercator projection, in degrees.
pub const MAX_MERCATOR_LAT: f64 = 85.051_129;

const WORLD_SIZE: f64 = (1u64 << TILE_BITS) as f64;

/// A point in 31-bit tile space. `x` grows eastward, `y` grows southward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TilePoint {
    pub x: u32,
    pub y: u32,
}

impl TilePoint {
    #[inline] pub const fn new(x: u32, y: u32) -> Self { Self { x, y } }

    /// Project a geographic coordinate into tile space.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Result<Self> {
        check_lat_lon(lat, lon)?;
        Ok(Self { x: project_lon(lon), y: project_lat(lat) })
    }

    /// Inverse projection, returning `(lat, lon)`.
    pub fn to_lat_lon(self) -> (f64, f64) {
        (tile_y_to_lat(self.y), tile_x_to_lon(self.x))
    }
}

fn check_lat_lon(lat: f64, lon: f64) -> Result<()> {
    if !lat.is_finite() || !lon.is_finite() || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::InvalidCoordinate { lat, lon });
    }
    Ok(())
}

#[inline]
fn to_tile(v: f64) -> u32 {
    (v.floor().max(0.0) as u64).min(MAX_TILE_COORD as u64) as u32
}

fn project_lon(lon: f64) -> u32 {
    to_tile((lon + 180.0) / 360.0 * WORLD_SIZE)
}

fn project_lat(lat: f64) -> u32 {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let merc = (lat.tan() + 1.0 / lat.cos()).ln();
    to_tile((1.0 - merc / PI) / 2.0 * WORLD_SIZE)
}

/// Convert a longitude into a tile-space x coordinate.
pub fn lon_to_tile_x(lon: f64) -> Result<u32> {
    check_lat_lon(0.0, lon)?;
    Ok(project_lon(lon))
}

/// Convert a latitude into a tile-space y coordinate. Latitudes past the Mercator limit are clamped.
pub fn lat_to_tile_y(lat: f64) -> Result<u32> {
    check_lat_lon(lat, 0.0)?;
    Ok(project_lat(lat))
}

/// Convert a tile-space x coordinate back to longitude.
pub fn tile_x_to_lon(x: u32) -> f64 {
    x as f64 / WORLD_SIZE * 360.0 - 180.0
}

/// Convert a tile-space y coordinate back to latitude.
pub fn tile_y_to_lat(y: u32) -> f64 {
    let n = PI * (1.0 - 2.0 * y as f64 / WORLD_SIZE);
    n.sinh().atan().to_degrees()
}

/// Index of the tile containing `coord` at `zoom`.
pub fn tile_at_zoom(coord: u32, zoom: u8) -> Result<u32> {
    if zoom > TILE_BITS {
        return Err(Error::InvalidZoom(zoom));
    }
    Ok(coord >> (TILE_BITS - zoom))
}
