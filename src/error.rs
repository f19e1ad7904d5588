//! Error types for the diff/merge/split engine.

use std::path::PathBuf;

use thiserror::Error;

/// Engine errors.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error on a reader or writer with no associated path.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or unreadable input/output path.
    #[error("Failed to access {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Corrupt or truncated container.
    #[error("Container format error: {0}")]
    Format(String),

    /// Latitude/longitude outside the projectable domain.
    #[error("Invalid coordinate: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    /// Zoom level above the 31-bit tile grid.
    #[error("Invalid zoom level: {0} (max 31)")]
    InvalidZoom(u8),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Attach a path to a raw `std::io::Error`.
pub(crate) trait PathContext<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> PathContext<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::File { path: path.into(), source })
    }
}
