use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::geom::{BBox, TilePoint};
use crate::object::EncodingDictionary;

/// Ordered list of tag codes. Most objects carry only a handful.
pub type TagCodes = SmallVec<[u32; 4]>;

/// One map entity: geometry in tile space plus tag codes relative to its container's dictionary.
///
/// Immutable once built; the `with_*` methods consume the value and return a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapObject {
    id: i64,
    points: Vec<TilePoint>,
    inner_rings: Vec<Vec<TilePoint>>,
    types: TagCodes,
    additional_types: TagCodes,
    names: Vec<(u32, String)>,
    area: bool,
}

impl MapObject {
    /// A line or point object with rendering tag codes `types`.
    pub fn new(id: i64, points: Vec<TilePoint>, types: impl IntoIterator<Item = u32>) -> Self {
        Self {
            id,
            points,
            inner_rings: Vec::new(),
            types: types.into_iter().collect(),
            additional_types: TagCodes::new(),
            names: Vec::new(),
            area: false,
        }
    }

    /// Mark the object as a closed polygon (or not).
    pub fn with_area(mut self, area: bool) -> Self {
        self.area = area;
        self
    }

    pub fn with_inner_rings(mut self, rings: Vec<Vec<TilePoint>>) -> Self {
        self.inner_rings = rings;
        self
    }

    pub fn with_additional_types(mut self, codes: impl IntoIterator<Item = u32>) -> Self {
        self.additional_types = codes.into_iter().collect();
        self
    }

    /// Attach names keyed by the tag code of the name key. Stored sorted by code.
    pub fn with_names(mut self, names: impl IntoIterator<Item = (u32, String)>) -> Self {
        self.names = names.into_iter().collect();
        self.names.sort_by_key(|(code, _)| *code);
        self
    }

    #[inline] pub fn id(&self) -> i64 { self.id }
    #[inline] pub fn points(&self) -> &[TilePoint] { &self.points }
    #[inline] pub fn inner_rings(&self) -> &[Vec<TilePoint>] { &self.inner_rings }
    #[inline] pub fn types(&self) -> &[u32] { &self.types }
    #[inline] pub fn additional_types(&self) -> &[u32] { &self.additional_types }
    #[inline] pub fn names(&self) -> &[(u32, String)] { &self.names }
    #[inline] pub fn is_area(&self) -> bool { self.area }

    /// Engine-synthesized auxiliary point.
    #[inline] pub fn is_synthetic(&self) -> bool { self.id < 0 }

    /// First coordinate, used for region containment.
    #[inline] pub fn reference_point(&self) -> Option<TilePoint> { self.points.first().copied() }

    /// Bounding box over the outline and inner rings.
    pub fn bbox(&self) -> BBox {
        BBox::from_points(self.points.iter().chain(self.inner_rings.iter().flatten()))
    }

    /// True if any rendering type is the deletion marker in `dict`.
    pub fn is_tombstone(&self, dict: &EncodingDictionary) -> bool {
        self.types.iter().any(|&code| dict.is_deletion(code))
    }

    /// A tombstone for this object: same id and geometry, tagged only with `deletion_code`.
    pub fn to_tombstone(&self, deletion_code: u32) -> Self {
        Self {
            id: self.id,
            points: self.points.clone(),
            inner_rings: self.inner_rings.clone(),
            types: smallvec::smallvec![deletion_code],
            additional_types: TagCodes::new(),
            names: Vec::new(),
            area: self.area,
        }
    }

    /// Compare two objects whose codes live in different dictionaries.
    ///
    /// Geometry must match exactly; tag sequences must resolve to the same `(key, value)` pairs
    /// in the same order; names must match as a set of `(resolved key, text)`.
    pub fn semantic_eq(&self, dict: &EncodingDictionary, other: &Self, other_dict: &EncodingDictionary) -> bool {
        fn same_tags(a: &[u32], da: &EncodingDictionary, b: &[u32], db: &EncodingDictionary) -> bool {
            a.len() == b.len()
                && a.iter().zip(b).all(|(&ca, &cb)| match (da.resolve(ca), db.resolve(cb)) {
                    (Some(ta), Some(tb)) => ta == tb,
                    _ => false,
                })
        }

        fn resolved_names<'a>(names: &'a [(u32, String)], dict: &'a EncodingDictionary) -> Option<Vec<(&'a (String, String), &'a str)>> {
            let mut out = names.iter()
                .map(|(code, text)| dict.resolve(*code).map(|tag| (tag, text.as_str())))
                .collect::<Option<Vec<_>>>()?;
            out.sort_unstable();
            Some(out)
        }

        self.id == other.id
            && self.area == other.area
            && self.points == other.points
            && self.inner_rings == other.inner_rings
            && same_tags(&self.types, dict, &other.types, other_dict)
            && same_tags(&self.additional_types, dict, &other.additional_types, other_dict)
            && match (resolved_names(&self.names, dict), resolved_names(&other.names, other_dict)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
    }

    /// Re-anchor every code from `from` into `to`.
    pub fn translate(&self, from: &EncodingDictionary, to: &mut EncodingDictionary) -> Result<Self> {
        let mut map = |code: u32| to.translate(code, from)
            .ok_or_else(|| Error::format(format!("object {}: tag code {code} missing from dictionary", self.id)));

        let types = self.types.iter().map(|&c| map(c)).collect::<Result<TagCodes>>()?;
        let additional_types = self.additional_types.iter().map(|&c| map(c)).collect::<Result<TagCodes>>()?;
        let mut names = self.names.iter()
            .map(|(c, text)| -> Result<(u32, String)> { Ok((map(*c)?, text.clone())) })
            .collect::<Result<Vec<_>>>()?;
        names.sort_by_key(|(code, _)| *code);

        Ok(Self {
            id: self.id,
            points: self.points.clone(),
            inner_rings: self.inner_rings.clone(),
            types,
            additional_types,
            names,
            area: self.area,
        })
    }
}
