//! The three snapshot engines: diff, merge and region partition.

mod diff;
mod merge;
mod partition;

pub use diff::{compute_delta, delta_to_index, diff_containers, SnapshotView};
pub use merge::{merge, MergeOutcome};
pub(crate) use merge::output_is_current;
pub use partition::{partition, partition_container};
