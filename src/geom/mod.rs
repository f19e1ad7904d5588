mod bbox;
mod tile;

pub use bbox::BBox;
pub(crate) use bbox::IndexedBox;
pub use tile::{
    lat_to_tile_y, lon_to_tile_x, tile_at_zoom, tile_x_to_lon, tile_y_to_lat,
    TilePoint, MAX_MERCATOR_LAT, MAX_TILE_COORD, TILE_BITS,
};
