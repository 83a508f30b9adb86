//! Chunk offset correction for `stco` / `co64` tables.
//!
//! Both tables hold absolute file positions of sample data. When the bytes in
//! front of `mdat` grow or shrink, every entry has to move by the same amount.
//! A single delta is only correct while all mutations happen before the media
//! data; edits on both sides of an `mdat` would need per-range deltas.

use crate::boxes::FourCC;
use crate::error::{Error, Result};
use crate::known_boxes::{CO64, STCO};
use byteorder::{BigEndian, ByteOrder};

/// version+flags (4) and entry_count (4)
const TABLE_HEADER: usize = 8;

/// Decode the entries of an `stco` or `co64` payload.
pub fn chunk_offsets(tag: FourCC, data: &[u8]) -> Result<Vec<u64>> {
    let (count, width) = table_layout(tag, data)?;
    let entries = &data[TABLE_HEADER..TABLE_HEADER + count * width];
    Ok(entries
        .chunks_exact(width)
        .map(|e| if width == 4 { BigEndian::read_u32(e) as u64 } else { BigEndian::read_u64(e) })
        .collect())
}

/// Add `delta` to every entry of an `stco` or `co64` payload in place.
/// Returns the number of entries rewritten.
pub fn patch_chunk_offsets(tag: FourCC, data: &mut [u8], delta: i64) -> Result<usize> {
    let (count, width) = table_layout(tag, data)?;
    if delta == 0 {
        return Ok(count);
    }

    let entries = &mut data[TABLE_HEADER..TABLE_HEADER + count * width];
    for e in entries.chunks_exact_mut(width) {
        let offset = if width == 4 { BigEndian::read_u32(e) as u64 } else { BigEndian::read_u64(e) };
        let overflow = || Error::OffsetOverflow { tag, offset, delta };
        let shifted = offset.checked_add_signed(delta).ok_or_else(overflow)?;
        if width == 4 {
            BigEndian::write_u32(e, u32::try_from(shifted).map_err(|_| overflow())?);
        } else {
            BigEndian::write_u64(e, shifted);
        }
    }

    tracing::debug!(%tag, entries = count, delta, "patched chunk offsets");
    Ok(count)
}

fn table_layout(tag: FourCC, data: &[u8]) -> Result<(usize, usize)> {
    let width = match tag {
        STCO => 4,
        CO64 => 8,
        other => return Err(Error::malformed(format!("{other} is not a chunk offset table"))),
    };
    if data.len() < TABLE_HEADER {
        return Err(Error::InsufficientData { need: TABLE_HEADER, have: data.len() });
    }
    let count = BigEndian::read_u32(&data[4..8]) as usize;
    let need = TABLE_HEADER + count * width;
    if data.len() < need {
        return Err(Error::InsufficientData { need, have: data.len() });
    }
    Ok((count, width))
}
