//! File-level entry points: decode the inputs, run one engine, encode the result.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use ahash::AHashMap;
use rayon::prelude::*;

use crate::config::BuildConfig;
use crate::error::{Error, PathContext, Result};
use crate::geom::BBox;
use crate::io::container::{decode, encode, ContainerReader};
use crate::io::fs::ensure_dir_exists;
use crate::ops::{diff_containers, merge, output_is_current, partition_container, MergeOutcome};
use crate::region::BoundaryIndex;
use crate::rtree::NodeCache;
use crate::snapshot::ZoomBand;

/// Extension of every container this crate writes.
pub const CONTAINER_EXTENSION: &str = "mdlt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffReport {
    pub bands: usize,
    pub tombstones: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    /// The output was already newer than every input and was left alone.
    pub skipped: bool,
    pub objects: usize,
    pub bands: usize,
}

/// Diff `before` against `after` inside `region` and write the tombstones to `output`.
pub fn diff_files(before: &Path, after: &Path, output: &Path, region: &BBox, config: &BuildConfig) -> Result<DiffReport> {
    config.validate()?;
    let (old, new) = (decode(before)?, decode(after)?);
    let delta = diff_containers(&old, &new, region, config.reference_zoom)?;
    encode(output, &delta, config)?;
    Ok(DiffReport { bands: delta.bands.len(), tombstones: delta.object_count() })
}

fn modified(path: &Path) -> Result<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(meta) => meta.modified().with_path(path).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::File { path: path.to_path_buf(), source }),
    }
}

/// Merge `inputs` (oldest first) into `output`.
///
/// With `config.check_timestamps`, the run is skipped before any input is decoded when `output`
/// exists and was modified after every input file.
pub fn merge_files(inputs: &[PathBuf], output: &Path, config: &BuildConfig) -> Result<MergeReport> {
    config.validate()?;
    if config.check_timestamps {
        let input_times = inputs.iter()
            .map(|p| modified(p)?.ok_or_else(|| Error::File {
                path: p.clone(),
                source: std::io::Error::from(ErrorKind::NotFound),
            }))
            .collect::<Result<Vec<_>>>()?;
        if output_is_current(modified(output)?, input_times) {
            tracing::info!(output = %output.display(), "output is newer than every input, skipping merge");
            return Ok(MergeReport { skipped: true, objects: 0, bands: 0 });
        }
    }

    let containers = inputs.iter().map(|p| decode(p)).collect::<Result<Vec<_>>>()?;
    match merge(&containers, false, None)? {
        MergeOutcome::Merged(merged) => {
            encode(output, &merged, config)?;
            Ok(MergeReport { skipped: false, objects: merged.object_count(), bands: merged.bands.len() })
        }
        MergeOutcome::Skipped => Ok(MergeReport { skipped: true, objects: 0, bands: 0 }),
    }
}

/// File name for a region's output: path separators and other awkward characters become `_`.
pub fn region_file_name(name: &str) -> String {
    let stem: String = name.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('.');
    let stem = if stem.is_empty() { "region" } else { stem };
    format!("{stem}.{CONTAINER_EXTENSION}")
}

/// Split `input` by region into `out_dir/<region>.mdlt`, one file per non-empty region.
///
/// Regions are encoded in parallel. Each encode owns its scratch files; only the decoded input
/// and the boundaries are shared, read-only.
pub fn split_file(input: &Path, boundaries: &dyn BoundaryIndex, out_dir: &Path, config: &BuildConfig) -> Result<Vec<PathBuf>> {
    config.validate()?;
    let global = decode(input)?;
    let parts = partition_container(&global, boundaries);
    ensure_dir_exists(out_dir)?;

    let mut seen: AHashMap<String, &str> = AHashMap::with_capacity(parts.len());
    let mut jobs = Vec::with_capacity(parts.len());
    for (name, container) in &parts {
        let file = region_file_name(name);
        if let Some(other) = seen.insert(file.clone(), name) {
            return Err(Error::Config(format!("regions {other:?} and {name:?} both write {file}")));
        }
        jobs.push((out_dir.join(file), container));
    }

    let paths = jobs.par_iter()
        .map(|(path, container)| -> Result<PathBuf> {
            encode(path, container, config)?;
            Ok(path.clone())
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(input = %input.display(), regions = paths.len(), "split container");
    Ok(paths)
}

/// Ids per band whose stored box intersects `bbox`, answered from the on-disk trees.
pub fn query_file(path: &Path, bbox: &BBox, config: &BuildConfig) -> Result<BTreeMap<ZoomBand, Vec<i64>>> {
    config.validate()?;
    let reader = ContainerReader::open(path)?;
    let mut cache = NodeCache::new(config.cache_nodes);
    let mut out = BTreeMap::new();
    for band in reader.bands() {
        let Some(mut tree) = reader.tree(band)? else { continue };
        let mut ids = tree.range_query(bbox, &mut cache)?;
        ids.sort_unstable();
        out.insert(band, ids);
    }
    tracing::debug!(hits = cache.hits(), misses = cache.misses(), "queried container");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_names_become_safe_file_names() {
        assert_eq!(region_file_name("France"), "France.mdlt");
        assert_eq!(region_file_name("us/ca"), "us_ca.mdlt");
        assert_eq!(region_file_name(".."), "region.mdlt");
        assert_eq!(region_file_name("Île-de-France"), "Île-de-France.mdlt");
    }
}
