use crate::boxes::{Container, FourCC, HeaderKind, Mp4Box, Node, Payload};
use crate::error::{Error, Result};
use crate::known_boxes::{KnownBox, STSD_PREAMBLE, VISUAL_SAMPLE_ENTRY_PREAMBLE};
use crate::util::read_slice;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

/// Deepest container nesting accepted before the file is treated as malformed.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct BoxHeader {
    pub size: u64,         // total size including header, resolved for run-to-end boxes
    pub typ: FourCC,
    pub kind: HeaderKind,
    pub start: u64,        // file offset of header start
}

impl BoxHeader {
    pub fn header_size(&self) -> u64 {
        self.kind.header_size()
    }

    pub fn content_start(&self) -> u64 {
        self.start + self.header_size()
    }

    pub fn end(&self) -> u64 {
        self.start + self.size
    }
}

/// Read the header at the current stream position. `parent_end` bounds the
/// box: it is where a run-to-end box stops and past which no box may extend.
pub fn read_box_header<R: Read + Seek>(r: &mut R, parent_end: u64) -> Result<BoxHeader> {
    let start = r.stream_position()?;
    if parent_end.saturating_sub(start) < 8 {
        return Err(Error::malformed(format!("truncated box header at offset {start}")));
    }
    let size32 = r.read_u32::<BigEndian>()?;
    let mut typ = [0u8; 4]; r.read_exact(&mut typ)?;
    let typ = FourCC(typ);

    let (kind, size) = match size32 {
        1 => {
            if parent_end - start < 16 {
                return Err(Error::malformed(format!(
                    "{typ} at offset {start} declares a 64-bit size but the field is missing"
                )));
            }
            (HeaderKind::Large, r.read_u64::<BigEndian>()?)
        }
        0 => (HeaderKind::ToEnd, parent_end - start),
        n => (HeaderKind::Compact, n as u64),
    };

    if size < kind.header_size() {
        return Err(Error::malformed(format!(
            "{typ} at offset {start} has size {size}, smaller than its header"
        )));
    }
    if size > parent_end - start {
        return Err(Error::corrupt(format!(
            "{typ} at offset {start} with size {size} overruns its parent ending at {parent_end}"
        )));
    }

    Ok(BoxHeader { size, typ, kind, start })
}

/// Parse the boxes between the current stream position and `parent_end`.
pub fn parse_children<R: Read + Seek>(r: &mut R, parent_end: u64) -> Result<Vec<Node>> {
    parse_level(r, parent_end, 0)
}

fn parse_level<R: Read + Seek>(r: &mut R, parent_end: u64, depth: usize) -> Result<Vec<Node>> {
    let mut kids = Vec::new();
    while r.stream_position()? < parent_end {
        let h = read_box_header(r, parent_end)?;
        let node = parse_node(r, &h, depth)?;

        // Skip to end of box
        r.seek(SeekFrom::Start(h.end()))?;
        kids.push(node);
    }
    Ok(kids)
}

fn parse_node<R: Read + Seek>(r: &mut R, h: &BoxHeader, depth: usize) -> Result<Node> {
    let content_start = h.content_start();
    let Some(preamble_len) = preamble_len(r, h)? else {
        tracing::debug!(typ = %h.typ, offset = h.start, size = h.size, "leaf");
        return Ok(Node::Leaf(Mp4Box {
            name: h.typ,
            header: h.kind,
            start: Some(h.start),
            payload: Payload::Source { offset: content_start, len: h.end() - content_start },
        }));
    };

    if depth >= MAX_DEPTH {
        return Err(Error::malformed(format!(
            "{} at offset {} is nested deeper than {MAX_DEPTH} levels",
            h.typ, h.start
        )));
    }

    let preamble = read_slice(r, content_start, preamble_len)?;
    r.seek(SeekFrom::Start(content_start + preamble_len))?;
    let children = parse_level(r, h.end(), depth + 1)?;
    tracing::debug!(typ = %h.typ, offset = h.start, size = h.size, children = children.len(), "container");

    Ok(Node::Container(Container::from_parts(
        h.typ,
        h.kind,
        Some(h.start),
        preamble,
        children,
    )))
}

/// Number of fixed bytes ahead of the children, or `None` if the box is a leaf.
fn preamble_len<R: Read + Seek>(r: &mut R, h: &BoxHeader) -> Result<Option<u64>> {
    let kb = KnownBox::from(h.typ);
    let available = h.size - h.header_size();

    let len: usize = if kb.is_plain_container() {
        0
    } else if kb == KnownBox::Stsd {
        STSD_PREAMBLE
    } else if kb.is_visual_sample_entry() {
        VISUAL_SAMPLE_ENTRY_PREAMBLE
    } else if kb.is_sound_sample_description() {
        // QuickTime version lives after reserved(6) + data_reference_index(2)
        if available < 10 {
            return Ok(None);
        }
        r.seek(SeekFrom::Start(h.content_start() + 8))?;
        let version = r.read_u16::<BigEndian>()?;
        match KnownBox::sound_preamble_len(version) {
            Some(n) => n,
            None => {
                tracing::debug!(typ = %h.typ, version, "unknown sound description version, kept opaque");
                return Ok(None);
            }
        }
    } else {
        return Ok(None);
    };
    let len = len as u64;

    if len > available {
        return Err(Error::malformed(format!(
            "{} at offset {} is too short for its {len} fixed bytes",
            h.typ, h.start
        )));
    }
    Ok(Some(len))
}
