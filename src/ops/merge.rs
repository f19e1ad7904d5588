use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::snapshot::{Container, SnapshotIndex};

/// Result of a merge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The existing output is newer than every input; nothing was done.
    Skipped,
    Merged(Container),
}

/// True when an output modified at `existing` is strictly newer than every input time.
pub(crate) fn output_is_current(existing: Option<SystemTime>, inputs: impl IntoIterator<Item = SystemTime>) -> bool {
    existing.is_some_and(|existing| inputs.into_iter().all(|t| existing > t))
}

/// Fold `inputs`, oldest first, into one snapshot.
///
/// Per band, every record replaces whatever the accumulator holds for its id, so the newest
/// input mentioning an id wins. Tombstones are ordinary records here. Codes are re-anchored into
/// one output dictionary. The result is stamped with the newest input's `created` time.
///
/// With `check_timestamps`, an `existing_output_mtime` newer than every input skips the merge.
pub fn merge(inputs: &[Container], check_timestamps: bool, existing_output_mtime: Option<SystemTime>) -> Result<MergeOutcome> {
    if check_timestamps && output_is_current(existing_output_mtime, inputs.iter().map(|c| c.created)) {
        tracing::info!(inputs = inputs.len(), "output is newer than every input, skipping merge");
        return Ok(MergeOutcome::Skipped);
    }

    let created = inputs.iter().map(|c| c.created).max().unwrap_or(UNIX_EPOCH);
    let mut out = Container::new(created);
    for (step, input) in inputs.iter().enumerate() {
        let mut replaced = 0usize;
        for (&band, index) in &input.bands {
            let acc = out.bands.entry(band).or_insert_with(|| SnapshotIndex::new(band));
            for obj in index.iter() {
                if acc.insert(obj.translate(&input.dictionary, &mut out.dictionary)?).is_some() {
                    replaced += 1;
                }
            }
        }
        tracing::debug!(step, objects = input.object_count(), replaced, "folded input");
    }

    tracing::info!(inputs = inputs.len(), bands = out.bands.len(), objects = out.object_count(), "merged");
    Ok(MergeOutcome::Merged(out))
}
