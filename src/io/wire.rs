//! Bounds-checked little-endian primitives shared by the tree pages and the container codec.
//!
//! Every read names what it is reading so a truncated file reports where it ran out.

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};
use crate::geom::{BBox, TilePoint};

pub(crate) const BBOX_LEN: usize = 16;
pub(crate) const POINT_LEN: usize = 8;

#[inline]
pub(crate) fn need<B: Buf>(buf: &B, n: usize, what: &str) -> Result<()> {
    if buf.remaining() < n {
        return Err(Error::format(format!(
            "truncated {what}: need {n} bytes, {} remaining", buf.remaining()
        )));
    }
    Ok(())
}

pub(crate) fn get_u8<B: Buf>(buf: &mut B, what: &str) -> Result<u8> {
    need(buf, 1, what)?;
    Ok(buf.get_u8())
}

pub(crate) fn get_u16<B: Buf>(buf: &mut B, what: &str) -> Result<u16> {
    need(buf, 2, what)?;
    Ok(buf.get_u16_le())
}

pub(crate) fn get_u32<B: Buf>(buf: &mut B, what: &str) -> Result<u32> {
    need(buf, 4, what)?;
    Ok(buf.get_u32_le())
}

pub(crate) fn get_i64<B: Buf>(buf: &mut B, what: &str) -> Result<i64> {
    need(buf, 8, what)?;
    Ok(buf.get_i64_le())
}

/// Read a `u32` element count and check that `count * elem_len` bytes are actually present.
pub(crate) fn get_count<B: Buf>(buf: &mut B, elem_len: usize, what: &str) -> Result<usize> {
    let count = get_u32(buf, what)? as usize;
    let bytes = count.checked_mul(elem_len)
        .ok_or_else(|| Error::format(format!("{what} overflows: {count}")))?;
    if bytes > buf.remaining() {
        return Err(Error::format(format!(
            "{what} overruns section: {count} x {elem_len} bytes, {} remaining", buf.remaining()
        )));
    }
    Ok(count)
}

pub(crate) fn get_bbox<B: Buf>(buf: &mut B, what: &str) -> Result<BBox> {
    need(buf, BBOX_LEN, what)?;
    Ok(BBox::new(buf.get_u32_le(), buf.get_u32_le(), buf.get_u32_le(), buf.get_u32_le()))
}

pub(crate) fn put_bbox<B: BufMut>(buf: &mut B, bbox: &BBox) {
    buf.put_u32_le(bbox.min_x);
    buf.put_u32_le(bbox.min_y);
    buf.put_u32_le(bbox.max_x);
    buf.put_u32_le(bbox.max_y);
}

pub(crate) fn get_points<B: Buf>(buf: &mut B, what: &str) -> Result<Vec<TilePoint>> {
    let count = get_count(buf, POINT_LEN, what)?;
    Ok((0..count).map(|_| TilePoint::new(buf.get_u32_le(), buf.get_u32_le())).collect())
}

pub(crate) fn put_points<B: BufMut>(buf: &mut B, points: &[TilePoint]) {
    buf.put_u32_le(points.len() as u32);
    for p in points {
        buf.put_u32_le(p.x);
        buf.put_u32_le(p.y);
    }
}

pub(crate) fn get_string<B: Buf>(buf: &mut B, what: &str) -> Result<String> {
    let len = get_count(buf, 1, what)?;
    let bytes = buf.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec())
        .map_err(|_| Error::format(format!("{what} is not valid UTF-8")))
}

pub(crate) fn put_string<B: BufMut>(buf: &mut B, s: &str) {
    buf.put_u32_le(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_reads_are_format_errors() {
        let mut buf: &[u8] = &[1, 2, 3];
        assert!(matches!(get_u32(&mut buf, "count"), Err(Error::Format(_))));
    }

    #[test]
    fn count_overrun_is_detected() {
        // Claims 10 points but carries only one.
        let mut bytes = Vec::new();
        bytes.put_u32_le(10);
        bytes.put_u32_le(1);
        bytes.put_u32_le(2);
        let mut buf = bytes.as_slice();
        let err = get_points(&mut buf, "points").unwrap_err();
        assert!(err.to_string().contains("overruns"), "{err}");
    }

    #[test]
    fn strings_reject_bad_utf8() {
        let mut bytes = Vec::new();
        bytes.put_u32_le(2);
        bytes.put_slice(&[0xff, 0xfe]);
        assert!(matches!(get_string(&mut bytes.as_slice(), "key"), Err(Error::Format(_))));
    }
}
