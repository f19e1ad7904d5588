#![doc = "mapdelta: diff, merge and region split for tiled vector map snapshots"]
pub mod config;
mod error;
pub mod geom;
pub mod io;
pub mod object;
pub mod ops;
pub mod pipeline;
pub mod region;
pub mod rtree;
pub mod snapshot;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use config::BuildConfig;

#[doc(inline)]
pub use geom::{BBox, TilePoint};

#[doc(inline)]
pub use object::{DeltaRecord, EncodingDictionary, MapObject};

#[doc(inline)]
pub use snapshot::{Container, SnapshotIndex, ZoomBand};

#[doc(inline)]
pub use io::container::{decode, encode, read_created, ContainerReader};

#[doc(inline)]
pub use ops::{compute_delta, merge, partition, MergeOutcome, SnapshotView};

#[doc(inline)]
pub use pipeline::{diff_files, merge_files, query_file, split_file, DiffReport, MergeReport};
