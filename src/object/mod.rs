mod delta;
mod dictionary;
mod record;

pub use delta::DeltaRecord;
pub use dictionary::{EncodingDictionary, DELETION_KEY, DELETION_VALUE};
pub use record::{MapObject, TagCodes};
