use ahash::AHashMap;

/// Key of the reserved tag marking a tombstone.
pub const DELETION_KEY: &str = "osmand_change";
/// Value of the reserved tag marking a tombstone.
pub const DELETION_VALUE: &str = "delete";

/// Bidirectional `code <-> (key, value)` map scoped to one container.
///
/// Codes are dense and handed out in insertion order, so a code is never reused within a
/// dictionary. Codes from two different dictionaries are unrelated; compare the resolved pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodingDictionary {
    tags: Vec<(String, String)>,
    codes: AHashMap<(String, String), u32>,
}

impl EncodingDictionary {
    pub fn new() -> Self { Self::default() }

    #[inline] pub fn len(&self) -> usize { self.tags.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.tags.is_empty() }

    /// Look up the tag for `code`.
    #[inline]
    pub fn resolve(&self, code: u32) -> Option<&(String, String)> {
        self.tags.get(code as usize)
    }

    /// Look up the code for a tag without inserting it.
    pub fn get(&self, key: &str, value: &str) -> Option<u32> {
        self.codes.get(&(key.to_owned(), value.to_owned())).copied()
    }

    /// Code for a tag, inserting the tag with the next free code if it is new.
    pub fn code_for(&mut self, key: &str, value: &str) -> u32 {
        let tag = (key.to_owned(), value.to_owned());
        if let Some(&code) = self.codes.get(&tag) {
            return code;
        }
        let code = self.tags.len() as u32;
        self.tags.push(tag.clone());
        self.codes.insert(tag, code);
        code
    }

    /// Re-anchor a code from `from` into this dictionary. `None` if `from` has no such code.
    pub fn translate(&mut self, code: u32, from: &EncodingDictionary) -> Option<u32> {
        let (key, value) = from.resolve(code)?;
        Some(self.code_for(key, value))
    }

    /// Code of the reserved deletion marker, inserting it if needed.
    pub fn deletion_code(&mut self) -> u32 {
        self.code_for(DELETION_KEY, DELETION_VALUE)
    }

    /// True if `code` resolves to the deletion marker.
    pub fn is_deletion(&self, code: u32) -> bool {
        self.resolve(code)
            .is_some_and(|(k, v)| k == DELETION_KEY && v == DELETION_VALUE)
    }

    /// Iterate `(code, (key, value))` in code order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &(String, String))> {
        self.tags.iter().enumerate().map(|(i, tag)| (i as u32, tag))
    }
}

impl FromIterator<(String, String)> for EncodingDictionary {
    /// Build a dictionary from tags in code order. Repeated tags keep their first code.
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut dict = Self::new();
        for (key, value) in iter {
            dict.code_for(&key, &value);
        }
        dict
    }
}
