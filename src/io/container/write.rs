use std::io::Write;
use std::path::Path;

use bytes::BufMut;

use super::{check_codes, FLAG_AREA, FORMAT_VERSION, MAGIC, SECTION_HEADER_LEN};
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::geom::BBox;
use crate::io::fs::open_for_write;
use crate::io::wire;
use crate::object::MapObject;
use crate::rtree::RTreeBuilder;
use crate::snapshot::{time_to_millis, Container, SnapshotIndex, ZoomBand};

/// Write `container` to `path`.
///
/// Each band gets its own packed tree, built over scratch files in the configured scratch
/// directory. The file is assembled next to `path` and only renamed onto it once complete, so an
/// error at any point leaves whatever was at `path` untouched.
pub fn encode(path: &Path, container: &Container, config: &BuildConfig) -> Result<()> {
    config.validate()?;
    let dict_len = container.dictionary.len();
    for obj in container.bands.values().flat_map(SnapshotIndex::iter) {
        check_codes(obj, dict_len)?;
    }

    let scratch_dir = config.scratch_dir_for(path);
    let mut out = open_for_write(path)?;

    let mut head = Vec::new();
    head.put_slice(&MAGIC);
    head.put_u32_le(FORMAT_VERSION);
    head.put_i64_le(time_to_millis(container.created));
    head.put_u32_le(dict_len as u32);
    for (_, (key, value)) in container.dictionary.iter() {
        wire::put_string(&mut head, key);
        wire::put_string(&mut head, value);
    }
    head.put_u32_le(container.bands.len() as u32);
    out.write_all(&head)?;

    for (&band, index) in &container.bands {
        write_section(&mut out, band, index, config, &scratch_dir, path)?;
    }

    let mut trailer = Vec::with_capacity(8);
    trailer.put_u32_le(FORMAT_VERSION);
    trailer.put_slice(&MAGIC);
    out.write_all(&trailer)?;
    out.finalize()?;

    tracing::info!(
        path = %path.display(),
        bands = container.bands.len(),
        objects = container.object_count(),
        tags = dict_len,
        "wrote container"
    );
    Ok(())
}

fn write_section<W: Write>(
    out: &mut W,
    band: ZoomBand,
    index: &SnapshotIndex,
    config: &BuildConfig,
    scratch_dir: &Path,
    output: &Path,
) -> Result<()> {
    let mut tree = RTreeBuilder::build(config, scratch_dir, output, band, index.iter().map(|o| (o.id(), o.bbox())))?;

    let records_len: u64 = index.iter().map(record_len).sum();
    let section_len = SECTION_HEADER_LEN + tree.byte_len() + 4 + records_len;

    let mut head = Vec::with_capacity(10 + SECTION_HEADER_LEN as usize);
    head.put_u8(band.min_zoom());
    head.put_u8(band.max_zoom());
    head.put_u64_le(section_len);
    head.put_u64_le(tree.byte_len());
    head.put_u32_le(tree.node_count());
    wire::put_bbox(&mut head, &tree.root().map(|r| r.bbox).unwrap_or_else(BBox::empty));
    out.write_all(&head)?;

    let written = tree.write_to(out)?;
    if written.byte_len != tree.byte_len() || written.leaf_order.len() != index.len() {
        return Err(Error::format(format!(
            "band {band}: repacked tree disagrees with its build ({} of {} bytes, {} of {} leaves)",
            written.byte_len, tree.byte_len(), written.leaf_order.len(), index.len()
        )));
    }

    out.write_all(&(index.len() as u32).to_le_bytes())?;
    let mut buf = Vec::new();
    for id in &written.leaf_order {
        let obj = index.get(*id)
            .ok_or_else(|| Error::format(format!("band {band}: tree leaf {id} has no record")))?;
        buf.clear();
        put_record(&mut buf, obj);
        out.write_all(&buf)?;
    }

    tracing::debug!(%band, objects = index.len(), nodes = written.node_count, bytes = section_len, "wrote band");
    Ok(())
}

fn record_len(obj: &MapObject) -> u64 {
    let points = |n: usize| 4 + (n * wire::POINT_LEN) as u64;
    8 + 1
        + points(obj.points().len())
        + 4 + obj.inner_rings().iter().map(|r| points(r.len())).sum::<u64>()
        + 4 + 4 * obj.types().len() as u64
        + 4 + 4 * obj.additional_types().len() as u64
        + 4 + obj.names().iter().map(|(_, text)| 8 + text.len() as u64).sum::<u64>()
}

pub(super) fn put_record<B: BufMut>(buf: &mut B, obj: &MapObject) {
    buf.put_i64_le(obj.id());
    buf.put_u8(if obj.is_area() { FLAG_AREA } else { 0 });
    wire::put_points(buf, obj.points());
    buf.put_u32_le(obj.inner_rings().len() as u32);
    for ring in obj.inner_rings() {
        wire::put_points(buf, ring);
    }
    for codes in [obj.types(), obj.additional_types()] {
        buf.put_u32_le(codes.len() as u32);
        codes.iter().for_each(|&c| buf.put_u32_le(c));
    }
    buf.put_u32_le(obj.names().len() as u32);
    for (code, text) in obj.names() {
        buf.put_u32_le(*code);
        wire::put_string(buf, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::TilePoint;

    #[test]
    fn record_len_matches_encoding() {
        let obj = MapObject::new(7, vec![TilePoint::new(1, 2), TilePoint::new(3, 4)], [0, 1])
            .with_area(true)
            .with_inner_rings(vec![vec![TilePoint::new(2, 2)]])
            .with_additional_types([2])
            .with_names([(3, "Rue de la Paix".to_owned())]);
        let mut buf = Vec::new();
        put_record(&mut buf, &obj);
        assert_eq!(buf.len() as u64, record_len(&obj));
    }
}
