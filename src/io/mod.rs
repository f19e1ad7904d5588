//! IO module for on-disk formats and file handling.
//!
//! # Modules
//!
//! - `container` - the `.mdlt` snapshot container codec and disk-backed reader
//! - `geojson` - region boundary loading
//! - `wire` - bounds-checked little-endian primitives
//! - `fs` - atomic output writes and build scratch files

pub mod container;
pub(crate) mod fs;
pub(crate) mod geojson;
pub(crate) mod wire;
