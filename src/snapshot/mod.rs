mod index;

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use index::SnapshotIndex;

use crate::error::{Error, Result};
use crate::geom::TILE_BITS;
use crate::object::EncodingDictionary;

/// Inclusive range of zoom levels one section of a container serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoomBand {
    min_zoom: u8,
    max_zoom: u8,
}

impl ZoomBand {
    pub fn new(min_zoom: u8, max_zoom: u8) -> Result<Self> {
        if max_zoom > TILE_BITS {
            return Err(Error::InvalidZoom(max_zoom));
        }
        if min_zoom > max_zoom {
            return Err(Error::InvalidZoom(min_zoom));
        }
        Ok(Self { min_zoom, max_zoom })
    }

    #[inline] pub fn min_zoom(&self) -> u8 { self.min_zoom }
    #[inline] pub fn max_zoom(&self) -> u8 { self.max_zoom }

    #[inline]
    pub fn contains(&self, zoom: u8) -> bool {
        self.min_zoom <= zoom && zoom <= self.max_zoom
    }
}

impl fmt::Display for ZoomBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min_zoom, self.max_zoom)
    }
}

/// Everything one container file holds: its dictionary and one `SnapshotIndex` per zoom band.
/// Every record's tag codes refer to `dictionary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub created: SystemTime,
    pub dictionary: EncodingDictionary,
    pub bands: BTreeMap<ZoomBand, SnapshotIndex>,
}

impl Container {
    /// An empty container. `created` is truncated to whole milliseconds, the stored precision.
    pub fn new(created: SystemTime) -> Self {
        Self {
            created: millis_to_time(time_to_millis(created)),
            dictionary: EncodingDictionary::new(),
            bands: BTreeMap::new(),
        }
    }

    pub fn with_dictionary(mut self, dictionary: EncodingDictionary) -> Self {
        self.dictionary = dictionary;
        self
    }

    #[inline]
    pub fn band(&self, band: ZoomBand) -> Option<&SnapshotIndex> { self.bands.get(&band) }

    /// The index for `band`, created empty if missing.
    pub fn band_mut(&mut self, band: ZoomBand) -> &mut SnapshotIndex {
        self.bands.entry(band).or_insert_with(|| SnapshotIndex::new(band))
    }

    pub fn insert_band(&mut self, index: SnapshotIndex) -> Option<SnapshotIndex> {
        self.bands.insert(index.band(), index)
    }

    /// Total number of objects over all bands.
    pub fn object_count(&self) -> usize {
        self.bands.values().map(SnapshotIndex::len).sum()
    }
}

/// Milliseconds since the Unix epoch; negative before it.
pub(crate) fn time_to_millis(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis().min(i64::MAX as u128) as i64,
        Err(e) => -(e.duration().as_millis().min(i64::MAX as u128) as i64),
    }
}

pub(crate) fn millis_to_time(millis: i64) -> SystemTime {
    if millis >= 0 {
        UNIX_EPOCH + Duration::from_millis(millis as u64)
    } else {
        UNIX_EPOCH - Duration::from_millis(millis.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_band_validation() {
        assert!(ZoomBand::new(5, 3).is_err());
        assert!(ZoomBand::new(0, 32).is_err());
        let band = ZoomBand::new(7, 11).unwrap();
        assert!(band.contains(7) && band.contains(11) && !band.contains(12));
        assert_eq!(band.to_string(), "7-11");
    }

    #[test]
    fn millis_round_trip() {
        for millis in [0, 1, 1_700_000_000_123, -5_000] {
            assert_eq!(time_to_millis(millis_to_time(millis)), millis);
        }
    }

    #[test]
    fn created_is_truncated_to_millis() {
        let t = UNIX_EPOCH + Duration::from_nanos(1_500_000_999);
        assert_eq!(Container::new(t).created, UNIX_EPOCH + Duration::from_millis(1_500));
    }
}
