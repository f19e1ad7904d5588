use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::{Buf, Bytes};

use super::{
    check_codes, BAND_HEADER_LEN, FLAG_AREA, FORMAT_VERSION, HEADER_LEN, MAGIC, SECTION_HEADER_LEN, TRAILER_LEN,
};
use crate::error::{Error, PathContext, Result};
use crate::geom::BBox;
use crate::io::wire;
use crate::object::{EncodingDictionary, MapObject};
use crate::rtree::reader::{check_tree, TreeSpan};
use crate::rtree::{next_tree_token, ChildRef, StoredTree};
use crate::snapshot::{millis_to_time, Container, SnapshotIndex, ZoomBand};

/// Length-aware sequential reader: refuses to read past the end of the file before allocating.
struct Source<R> {
    reader: R,
    pos: u64,
    len: u64,
}

impl<R: Read + Seek> Source<R> {
    fn remaining(&self) -> u64 { self.len.saturating_sub(self.pos) }

    fn take(&mut self, n: u64, what: &str) -> Result<Bytes> {
        if n > self.remaining() {
            return Err(Error::format(format!(
                "truncated {what}: need {n} bytes at offset {}, file has {}", self.pos, self.len
            )));
        }
        let mut buf = vec![0u8; n as usize];
        self.reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::format(format!("truncated {what}")),
            _ => Error::Io(e),
        })?;
        self.pos += n;
        Ok(Bytes::from(buf))
    }

    fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.reader.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        Ok(self.take(4, what)?.get_u32_le())
    }

    fn read_string(&mut self, what: &str) -> Result<String> {
        let len = self.read_u32(what)?;
        let bytes = self.take(len as u64, what)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::format(format!("{what} is not valid UTF-8")))
    }
}

fn open_source(path: &Path) -> Result<Source<BufReader<File>>> {
    let file = File::open(path).with_path(path)?;
    let len = file.metadata().with_path(path)?.len();
    Ok(Source { reader: BufReader::new(file), pos: 0, len })
}

fn read_header<R: Read + Seek>(src: &mut Source<R>) -> Result<SystemTime> {
    let mut head = src.take(HEADER_LEN, "header")?;
    let mut magic = [0u8; 4];
    head.copy_to_slice(&mut magic);
    if magic != MAGIC {
        return Err(Error::format(format!("bad magic {magic:?}, not a container")));
    }
    let version = head.get_u32_le();
    if version != FORMAT_VERSION {
        return Err(Error::format(format!("unsupported container version {version}")));
    }
    Ok(millis_to_time(head.get_i64_le()))
}

fn read_dictionary<R: Read + Seek>(src: &mut Source<R>) -> Result<EncodingDictionary> {
    let count = src.read_u32("dictionary size")?;
    // Each entry is at least two empty strings.
    if count as u64 * 8 > src.remaining() {
        return Err(Error::format(format!("dictionary of {count} entries overruns the file")));
    }
    let mut tags = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let key = src.read_string("dictionary key")?;
        let value = src.read_string("dictionary value")?;
        tags.push((key, value));
    }
    let dictionary: EncodingDictionary = tags.into_iter().collect();
    if dictionary.len() != count as usize {
        return Err(Error::format("dictionary repeats a tag"));
    }
    Ok(dictionary)
}

/// Where one band's section sits in the file, plus its parsed section header.
#[derive(Debug, Clone, Copy)]
struct SectionInfo {
    /// Absolute offset of the section's first byte.
    offset: u64,
    len: u64,
    tree_len: u64,
    node_count: u32,
    root_bbox: BBox,
}

impl SectionInfo {
    fn tree_base(&self) -> u64 { self.offset + SECTION_HEADER_LEN }

    fn root(&self) -> Option<ChildRef> {
        (self.node_count > 0).then_some(ChildRef { offset: 0, bbox: self.root_bbox })
    }
}

/// An open container whose band sections have been located but not decoded.
///
/// Use [`ContainerReader::tree`] to range-query a band straight from disk, or
/// [`ContainerReader::read_band`] to decode one band's records.
#[derive(Debug)]
pub struct ContainerReader {
    path: PathBuf,
    created: SystemTime,
    dictionary: EncodingDictionary,
    sections: BTreeMap<ZoomBand, SectionInfo>,
}

impl ContainerReader {
    /// Read the header, dictionary and band directory of `path` and check the trailer.
    pub fn open(path: &Path) -> Result<Self> {
        let mut src = open_source(path)?;
        let created = read_header(&mut src)?;
        let dictionary = read_dictionary(&mut src)?;

        let band_count = src.read_u32("band count")?;
        let mut sections = BTreeMap::new();
        for _ in 0..band_count {
            let mut head = src.take(BAND_HEADER_LEN, "band header")?;
            let (min_zoom, max_zoom) = (head.get_u8(), head.get_u8());
            let band = ZoomBand::new(min_zoom, max_zoom)
                .map_err(|_| Error::format(format!("invalid zoom band {min_zoom}-{max_zoom}")))?;
            let len = head.get_u64_le();
            if len > src.remaining().saturating_sub(TRAILER_LEN) {
                return Err(Error::format(format!("band {band}: section of {len} bytes overruns the file")));
            }
            if len < SECTION_HEADER_LEN + 4 {
                return Err(Error::format(format!("band {band}: section of {len} bytes is too short")));
            }
            let offset = src.pos;

            let mut section = src.take(SECTION_HEADER_LEN, "section header")?;
            let tree_len = section.get_u64_le();
            let node_count = section.get_u32_le();
            let root_bbox = wire::get_bbox(&mut section, "root bbox")?;
            if tree_len > len - SECTION_HEADER_LEN - 4 {
                return Err(Error::format(format!("band {band}: tree of {tree_len} bytes overruns its section")));
            }

            let info = SectionInfo { offset, len, tree_len, node_count, root_bbox };
            if sections.insert(band, info).is_some() {
                return Err(Error::format(format!("band {band} appears twice")));
            }
            src.seek_to(offset + len)?;
        }

        let mut trailer = src.take(TRAILER_LEN, "trailer")?;
        let version = trailer.get_u32_le();
        let mut magic = [0u8; 4];
        trailer.copy_to_slice(&mut magic);
        if version != FORMAT_VERSION || magic != MAGIC {
            return Err(Error::format("trailer does not match header"));
        }
        if src.remaining() != 0 {
            return Err(Error::format(format!("{} trailing bytes after trailer", src.remaining())));
        }

        tracing::debug!(path = %path.display(), bands = sections.len(), tags = dictionary.len(), "opened container");
        Ok(Self { path: path.to_path_buf(), created, dictionary, sections })
    }

    #[inline] pub fn path(&self) -> &Path { &self.path }
    #[inline] pub fn created(&self) -> SystemTime { self.created }
    #[inline] pub fn dictionary(&self) -> &EncodingDictionary { &self.dictionary }

    pub fn bands(&self) -> impl Iterator<Item = ZoomBand> + '_ { self.sections.keys().copied() }

    /// A disk-backed handle on `band`'s tree, or `None` if the container has no such band.
    pub fn tree(&self, band: ZoomBand) -> Result<Option<StoredTree>> {
        let Some(info) = self.sections.get(&band) else { return Ok(None) };
        let file = File::open(&self.path).with_path(&self.path)?;
        let span = TreeSpan { base: info.tree_base(), len: info.tree_len, root: info.root(), token: next_tree_token() };
        Ok(Some(StoredTree::new(file, span, info.node_count)))
    }

    /// Decode every record of `band`, validating its tree against them.
    pub fn read_band(&self, band: ZoomBand) -> Result<Option<SnapshotIndex>> {
        let Some(info) = self.sections.get(&band) else { return Ok(None) };
        let mut src = open_source(&self.path)?;
        read_section(&mut src, band, info, &self.dictionary).map(Some)
    }

    /// Decode every band into a `Container`.
    pub fn into_container(self) -> Result<Container> {
        let mut src = open_source(&self.path)?;
        let mut container = Container::new(self.created);
        for (&band, info) in &self.sections {
            container.insert_band(read_section(&mut src, band, info, &self.dictionary)?);
        }
        container.dictionary = self.dictionary;
        Ok(container)
    }
}

fn read_section<R: Read + Seek>(
    src: &mut Source<R>,
    band: ZoomBand,
    info: &SectionInfo,
    dict: &EncodingDictionary,
) -> Result<SnapshotIndex> {
    src.seek_to(info.tree_base())?;
    let tree = src.take(info.tree_len, "tree")?;
    let leaves = check_tree(&tree, info.node_count, &info.root_bbox)?;

    let mut body = src.take(info.len - SECTION_HEADER_LEN - info.tree_len, "records")?;
    let count = wire::get_u32(&mut body, "record count")? as usize;
    if count != leaves.len() {
        return Err(Error::format(format!(
            "band {band}: {count} records but the tree indexes {}", leaves.len()
        )));
    }

    let mut index = SnapshotIndex::new(band);
    let mut replaced = 0usize;
    for leaf in &leaves {
        let obj = get_record(&mut body, dict)?;
        if obj.id() != leaf.id || obj.bbox() != leaf.bbox {
            return Err(Error::format(format!(
                "band {band}: record {} does not match tree leaf {}", obj.id(), leaf.id
            )));
        }
        if index.insert(obj).is_some() {
            replaced += 1;
        }
    }
    if replaced > 0 {
        tracing::debug!(band = %band, replaced, "repeated ids resolved to their last record");
    }
    if body.has_remaining() {
        return Err(Error::format(format!("band {band}: {} bytes after the last record", body.remaining())));
    }
    Ok(index)
}

pub(super) fn get_record<B: Buf>(buf: &mut B, dict: &EncodingDictionary) -> Result<MapObject> {
    let id = wire::get_i64(buf, "record id")?;
    let flags = wire::get_u8(buf, "record flags")?;
    if flags & !FLAG_AREA != 0 {
        return Err(Error::format(format!("object {id}: unknown flags {flags:#04x}")));
    }
    let points = wire::get_points(buf, "points")?;
    if points.is_empty() {
        return Err(Error::format(format!("object {id} has no points")));
    }
    let ring_count = wire::get_count(buf, 4, "inner ring count")?;
    let inner_rings = (0..ring_count)
        .map(|_| wire::get_points(buf, "inner ring"))
        .collect::<Result<Vec<_>>>()?;
    let types = get_codes(buf, "type count")?;
    let additional_types = get_codes(buf, "additional type count")?;
    let name_count = wire::get_count(buf, 8, "name count")?;
    let names = (0..name_count)
        .map(|_| -> Result<(u32, String)> {
            let code = wire::get_u32(buf, "name code")?;
            Ok((code, wire::get_string(buf, "name")?))
        })
        .collect::<Result<Vec<_>>>()?;

    let obj = MapObject::new(id, points, types)
        .with_area(flags & FLAG_AREA != 0)
        .with_inner_rings(inner_rings)
        .with_additional_types(additional_types)
        .with_names(names);
    check_codes(&obj, dict.len())?;
    Ok(obj)
}

fn get_codes<B: Buf>(buf: &mut B, what: &str) -> Result<Vec<u32>> {
    let count = wire::get_count(buf, 4, what)?;
    Ok((0..count).map(|_| buf.get_u32_le()).collect())
}

/// Decode the whole container at `path`. Any structural problem is an `Error::Format`.
pub fn decode(path: &Path) -> Result<Container> {
    let container = ContainerReader::open(path)?.into_container()?;
    tracing::info!(
        path = %path.display(),
        bands = container.bands.len(),
        objects = container.object_count(),
        "read container"
    );
    Ok(container)
}

/// The `created` timestamp of the container at `path`, read from its header alone.
pub fn read_created(path: &Path) -> Result<SystemTime> {
    read_header(&mut open_source(path)?)
}
