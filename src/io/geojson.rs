use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::region::PolygonRegion;

/// Read regions from GeoJSON bytes.
///
/// Every feature must carry a `Polygon` or `MultiPolygon` geometry and a string
/// `properties.name`; `properties.category` is optional.
pub(crate) fn read_regions_from_geojson_bytes(bytes: &[u8]) -> Result<Vec<PolygonRegion>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::format(format!("invalid GeoJSON: {e}")))?;
    let features = value["features"].as_array()
        .ok_or_else(|| Error::format("GeoJSON has no features array"))?;

    features.iter().enumerate()
        .map(|(i, feature)| {
            let properties = &feature["properties"];
            let name = properties["name"].as_str()
                .ok_or_else(|| Error::format(format!("feature {i} has no properties.name")))?;
            let category = properties["category"].as_str().unwrap_or("");
            let shape = parse_geometry(&feature["geometry"])
                .map_err(|e| Error::format(format!("feature {i} ({name}): {e}")))?;
            PolygonRegion::new(name, category, shape)
        })
        .collect()
}

fn parse_geometry(geometry: &Value) -> std::result::Result<MultiPolygon<f64>, String> {
    let coords = geometry["coordinates"].as_array()
        .ok_or("geometry has no coordinates")?;
    match geometry["type"].as_str() {
        Some("Polygon") => Ok(MultiPolygon(vec![parse_polygon(coords)?])),
        Some("MultiPolygon") => coords.iter()
            .map(|polygon| parse_polygon(polygon.as_array().ok_or("polygon must be an array")?))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(MultiPolygon),
        Some(other) => Err(format!("unsupported geometry type {other}")),
        None => Err("geometry has no type".into()),
    }
}

/// `[exterior, hole, hole, ...]`
fn parse_polygon(rings: &[Value]) -> std::result::Result<Polygon<f64>, String> {
    let mut rings = rings.iter().map(|ring| parse_ring(ring.as_array().ok_or("ring must be an array")?));
    let exterior = rings.next().ok_or("polygon has no exterior ring")??;
    let interiors = rings.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// `[[lon, lat], ...]`, closed if the input is not.
fn parse_ring(coords: &[Value]) -> std::result::Result<LineString<f64>, String> {
    let mut points = coords.iter()
        .map(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([x, y, ..]) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err("coordinates must be numbers".to_owned()),
            },
            _ => Err("position must have at least two numbers".to_owned()),
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if points.len() < 3 {
        return Err(format!("ring has {} positions, need at least 3", points.len()));
    }
    if points.first() != points.last() {
        points.push(points[0]);
    }
    Ok(LineString(points))
}
