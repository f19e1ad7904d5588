use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, PathContext, Result};

/// Default maximum number of entries per R-tree node.
pub const DEFAULT_NODE_CAPACITY: usize = 64;

/// Default number of decoded nodes kept in a `NodeCache`.
pub const DEFAULT_CACHE_NODES: usize = 1024;

/// Zoom level the diff region is snapped to before range queries.
pub const DEFAULT_REFERENCE_ZOOM: u8 = 15;

/// Tuning knobs shared by every build step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Maximum entries per R-tree node (fanout).
    pub node_capacity: usize,
    /// Capacity of the per-build node cache, in nodes.
    pub cache_nodes: usize,
    /// Zoom level used to snap diff regions onto the tile grid.
    pub reference_zoom: u8,
    /// Directory for scratch tree files; defaults to the output file's directory.
    pub scratch_dir: Option<PathBuf>,
    /// Skip a merge when the existing output is newer than every input.
    pub check_timestamps: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            node_capacity: DEFAULT_NODE_CAPACITY,
            cache_nodes: DEFAULT_CACHE_NODES,
            reference_zoom: DEFAULT_REFERENCE_ZOOM,
            scratch_dir: None,
            check_timestamps: false,
        }
    }
}

impl BuildConfig {
    /// Read a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_path(path)?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_capacity < 2 || self.node_capacity > u16::MAX as usize {
            return Err(Error::Config(format!(
                "node_capacity must be in 2..={}, got {}", u16::MAX, self.node_capacity
            )));
        }
        if self.cache_nodes == 0 {
            return Err(Error::Config("cache_nodes must be at least 1".into()));
        }
        if self.reference_zoom > 31 {
            return Err(Error::Config(format!("reference_zoom must be <= 31, got {}", self.reference_zoom)));
        }
        Ok(())
    }

    /// Directory scratch files for `output` are created in.
    pub fn scratch_dir_for(&self, output: &Path) -> PathBuf {
        match &self.scratch_dir {
            Some(dir) => dir.clone(),
            None => output.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(BuildConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: BuildConfig = serde_json::from_str(r#"{"node_capacity": 8}"#).unwrap();
        assert_eq!(config.node_capacity, 8);
        assert_eq!(config.cache_nodes, DEFAULT_CACHE_NODES);
        assert_eq!(config.reference_zoom, DEFAULT_REFERENCE_ZOOM);
    }

    #[test]
    fn rejects_tiny_fanout() {
        let config = BuildConfig { node_capacity: 1, ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn scratch_dir_defaults_to_output_parent() {
        let config = BuildConfig::default();
        assert_eq!(config.scratch_dir_for(Path::new("/tmp/out/world.mdlt")), PathBuf::from("/tmp/out"));
        assert_eq!(config.scratch_dir_for(Path::new("world.mdlt")), PathBuf::from("."));
    }
}
