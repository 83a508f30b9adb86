use crate::boxes::{fit_headers, Container, FourCC, Node, Payload};
use crate::error::{Error, Result};
use crate::known_boxes::{KnownBox, MDAT, MOOV, STBL};
use crate::offsets::patch_chunk_offsets;
use crate::parser::parse_children;
use crate::util::copy_range;
use std::io::{Read, Seek, SeekFrom, Write};

/// The top-level boxes of an MP4/MOV file.
///
/// Leaf payloads stay in the source file until [`Mpeg4Container::save`]
/// streams them out, so `mdat` is never held in memory. The same source
/// reader that was passed to [`Mpeg4Container::load`] must be handed back to
/// `save` and to any payload reads.
#[derive(Debug, Clone)]
pub struct Mpeg4Container {
    contents: Vec<Node>,
    moov_index: usize,
    /// Payload offset of the first `mdat` in the source file.
    first_mdat_position: Option<u64>,
}

impl Mpeg4Container {
    /// Parse the whole box tree of `r`.
    pub fn load<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let file_len = r.seek(SeekFrom::End(0))?;
        r.seek(SeekFrom::Start(0))?;

        let contents = parse_children(r, file_len)?;
        let moov_index = contents
            .iter()
            .position(|n| n.name() == MOOV && n.is_container())
            .ok_or_else(|| Error::corrupt("no moov box"))?;

        let first_mdat_position = contents
            .iter()
            .find(|n| n.name() == MDAT)
            .and_then(Node::as_leaf)
            .and_then(|b| b.content_start());

        tracing::debug!(
            boxes = contents.len(),
            file_len,
            mdat = ?first_mdat_position,
            "loaded box tree"
        );

        Ok(Self { contents, moov_index, first_mdat_position })
    }

    pub fn contents(&self) -> &[Node] {
        &self.contents
    }

    pub fn moov(&self) -> &Container {
        match &self.contents[self.moov_index] {
            Node::Container(c) => c,
            Node::Leaf(_) => unreachable!("moov is checked to be a container at load"),
        }
    }

    pub fn moov_mut(&mut self) -> &mut Container {
        match &mut self.contents[self.moov_index] {
            Node::Container(c) => c,
            Node::Leaf(_) => unreachable!("moov is checked to be a container at load"),
        }
    }

    /// Total size of the file as it would be written now.
    pub fn size(&self) -> u64 {
        self.contents.iter().map(Node::size).sum()
    }

    /// Recompute every size in the tree bottom-up.
    pub fn resize(&mut self) {
        for node in &mut self.contents {
            if let Node::Container(c) = node {
                c.resize();
            }
        }
        fit_headers(&mut self.contents);
    }

    /// Write the tree to `dst`, copying untouched payloads from `src` and
    /// shifting chunk offsets by however far the first `mdat` moved.
    /// Returns the number of bytes written.
    pub fn save<R: Read + Seek, W: Write + ?Sized>(&mut self, src: &mut R, dst: &mut W) -> Result<u64> {
        self.resize();
        let delta = self.mdat_delta();
        tracing::debug!(delta, "chunk offset delta");

        for node in &self.contents {
            write_node(node, None, src, dst, delta)?;
        }
        Ok(self.size())
    }

    /// New payload position of the first `mdat` minus its original position.
    fn mdat_delta(&self) -> i64 {
        if self.first_mdat_position.is_none() {
            return 0;
        }

        let mut delta = None;
        let mut position = 0u64;
        for node in &self.contents {
            let old = node
                .as_leaf()
                .filter(|b| b.name == MDAT)
                .and_then(|b| b.content_start());
            if let Some(old) = old {
                let moved = (position + node.header_size()) as i64 - old as i64;
                match delta {
                    None => delta = Some(moved),
                    Some(d) if d != moved => tracing::warn!(
                        offset = old,
                        moved,
                        delta = d,
                        "mdat shifted by a different amount than the first mdat, its chunk offsets will be wrong"
                    ),
                    Some(_) => {}
                }
            }
            position += node.size();
        }
        delta.unwrap_or(0)
    }
}

fn write_node<R: Read + Seek, W: Write + ?Sized>(
    node: &Node,
    parent: Option<FourCC>,
    src: &mut R,
    dst: &mut W,
    delta: i64,
) -> Result<()> {
    match node {
        Node::Leaf(b) => {
            b.header.write(dst, b.name, b.content_size())?;
            let is_table = parent == Some(STBL) && KnownBox::from(b.name).is_chunk_offset_table();
            if is_table && delta != 0 {
                let mut data = b.read_contents(src)?;
                patch_chunk_offsets(b.name, &mut data, delta)?;
                dst.write_all(&data)?;
                return Ok(());
            }
            match &b.payload {
                Payload::Source { offset, len } => {
                    copy_range(src, dst, *offset, *len)?;
                }
                Payload::Owned(v) => dst.write_all(v)?,
            }
        }
        Node::Container(c) => {
            c.header.write(dst, c.name, c.content_size())?;
            dst.write_all(&c.preamble)?;
            for child in c.children() {
                write_node(child, Some(c.name), src, dst, delta)?;
            }
        }
    }
    Ok(())
}
