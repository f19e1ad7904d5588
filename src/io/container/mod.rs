//! The `.mdlt` snapshot container.
//!
//! ```text
//! header    magic "MDLT" | version u32 | created unix millis i64
//! dict      entry count u32 | (key len u32, key, value len u32, value)*
//! bands     band count u32 | (min_zoom u8, max_zoom u8, section len u64, section)*
//!   section tree len u64 | node count u32 | root bbox | tree | record count u32 | records
//! trailer   version u32 | magic "MDLT"
//! ```
//!
//! Records are stored in the order a reader walking the section's tree visits their leaves.

mod read;
mod write;

pub use read::{decode, read_created, ContainerReader};
pub use write::encode;

use crate::error::{Error, Result};
use crate::io::wire::BBOX_LEN;
use crate::object::MapObject;

pub(crate) const MAGIC: [u8; 4] = *b"MDLT";
pub(crate) const FORMAT_VERSION: u32 = 1;

pub(crate) const HEADER_LEN: u64 = 4 + 4 + 8;
pub(crate) const TRAILER_LEN: u64 = 4 + 4;
/// `min_zoom | max_zoom | section len`
pub(crate) const BAND_HEADER_LEN: u64 = 1 + 1 + 8;
/// `tree len | node count | root bbox`
pub(crate) const SECTION_HEADER_LEN: u64 = 8 + 4 + BBOX_LEN as u64;

const FLAG_AREA: u8 = 0b0000_0001;

/// Every tag code of `obj` must resolve in a dictionary of `dict_len` entries.
fn check_codes(obj: &MapObject, dict_len: usize) -> Result<()> {
    let codes = obj.types().iter()
        .chain(obj.additional_types())
        .chain(obj.names().iter().map(|(code, _)| code));
    for &code in codes {
        if code as usize >= dict_len {
            return Err(Error::format(format!(
                "object {}: tag code {code} outside dictionary of {dict_len} entries", obj.id()
            )));
        }
    }
    Ok(())
}
