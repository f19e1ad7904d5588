pub mod diff;
pub mod merge;
pub mod query;
pub mod split;

use anyhow::{Context, Result};
use mapdelta::{BBox, BuildConfig};

/// The `--config` file if given, else defaults.
pub fn load_config(cli: &crate::cli::Cli) -> Result<BuildConfig> {
    match &cli.config {
        Some(path) => BuildConfig::from_json_path(path)
            .with_context(|| format!("load config {}", path.display())),
        None => Ok(BuildConfig::default()),
    }
}

pub fn bbox_arg(bbox: &[f64; 4]) -> Result<BBox> {
    let [min_lon, min_lat, max_lon, max_lat] = *bbox;
    BBox::from_lon_lat(min_lon, min_lat, max_lon, max_lat)
        .with_context(|| format!("invalid --bbox {min_lon},{min_lat},{max_lon},{max_lat}"))
}
