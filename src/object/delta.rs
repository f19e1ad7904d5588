use crate::object::MapObject;

/// One object-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaRecord {
    /// New or replacement content for an id.
    Upsert(MapObject),
    /// The id was superseded; carries the last known geometry so consumers know where.
    Tombstone(MapObject),
}

impl DeltaRecord {
    #[inline]
    pub fn id(&self) -> i64 {
        self.object().id()
    }

    #[inline]
    pub fn object(&self) -> &MapObject {
        match self {
            Self::Upsert(obj) | Self::Tombstone(obj) => obj,
        }
    }

    #[inline]
    pub fn is_tombstone(&self) -> bool { matches!(self, Self::Tombstone(_)) }
}
