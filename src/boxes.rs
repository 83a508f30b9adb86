use crate::error::{Error, Result};
use crate::util::read_slice;
use byteorder::{BigEndian, WriteBytesExt};
use std::fmt;
use std::io::{Read, Seek, Write};

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else { None }
    }
    pub fn as_str_lossy(&self) -> String {
        self.0.iter().map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}
impl fmt::Debug for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }
impl fmt::Display for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }

/// Encoding of a box's size field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    /// 32-bit size, 8-byte header.
    Compact,
    /// Size field `1` followed by a 64-bit size, 16-byte header.
    Large,
    /// Size field `0`: the box runs to the end of its parent (or the file).
    ToEnd,
}

impl HeaderKind {
    pub fn header_size(self) -> u64 {
        match self {
            HeaderKind::Large => 16,
            HeaderKind::Compact | HeaderKind::ToEnd => 8,
        }
    }

    /// Widen a compact header when `content_size` no longer fits the 32-bit field.
    /// Never narrows: a large header read from disk stays large.
    pub fn fit(self, content_size: u64) -> HeaderKind {
        match self {
            HeaderKind::Compact if 8 + content_size > u32::MAX as u64 => HeaderKind::Large,
            other => other,
        }
    }

    pub fn write<W: Write + ?Sized>(self, w: &mut W, name: FourCC, content_size: u64) -> Result<()> {
        let total = self.header_size() + content_size;
        match self {
            HeaderKind::Compact => {
                let size = u32::try_from(total)
                    .map_err(|_| Error::malformed(format!("{name} of {total} bytes needs a 64-bit header")))?;
                w.write_u32::<BigEndian>(size)?;
                w.write_all(&name.0)?;
            }
            HeaderKind::Large => {
                w.write_u32::<BigEndian>(1)?;
                w.write_all(&name.0)?;
                w.write_u64::<BigEndian>(total)?;
            }
            HeaderKind::ToEnd => {
                w.write_u32::<BigEndian>(0)?;
                w.write_all(&name.0)?;
            }
        }
        Ok(())
    }
}

/// Where a leaf's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Unmodified bytes still sitting in the source file.
    Source { offset: u64, len: u64 },
    /// Bytes held in memory (synthesized or replaced).
    Owned(Vec<u8>),
}

impl Payload {
    pub fn len(&self) -> u64 {
        match self {
            Payload::Source { len, .. } => *len,
            Payload::Owned(v) => v.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A leaf box: header plus an opaque payload.
#[derive(Debug, Clone)]
pub struct Mp4Box {
    pub name: FourCC,
    pub header: HeaderKind,
    /// Offset of the header in the source file, `None` for synthesized boxes.
    pub start: Option<u64>,
    pub payload: Payload,
}

impl Mp4Box {
    pub fn new(name: FourCC, contents: Vec<u8>) -> Self {
        let header = HeaderKind::Compact.fit(contents.len() as u64);
        Self { name, header, start: None, payload: Payload::Owned(contents) }
    }

    pub fn header_size(&self) -> u64 {
        self.header.header_size()
    }

    pub fn content_size(&self) -> u64 {
        self.payload.len()
    }

    pub fn size(&self) -> u64 {
        self.header_size() + self.content_size()
    }

    /// Absolute offset of the payload in the source file.
    pub fn content_start(&self) -> Option<u64> {
        match self.payload {
            Payload::Source { offset, .. } => Some(offset),
            Payload::Owned(_) => None,
        }
    }

    pub fn set_contents(&mut self, contents: Vec<u8>) {
        self.header = self.header.fit(contents.len() as u64);
        self.payload = Payload::Owned(contents);
    }

    /// Materialize the whole payload. Meant for small metadata boxes, never `mdat`.
    pub fn read_contents<R: Read + Seek>(&self, src: &mut R) -> Result<Vec<u8>> {
        match &self.payload {
            Payload::Source { offset, len } => Ok(read_slice(src, *offset, *len)?),
            Payload::Owned(v) => Ok(v.clone()),
        }
    }

    /// Read `len` bytes starting `offset` bytes into the payload.
    pub fn read_range<R: Read + Seek>(&self, src: &mut R, offset: u64, len: u64) -> Result<Vec<u8>> {
        let end = offset + len;
        if end > self.content_size() {
            return Err(Error::InsufficientData {
                need: end as usize,
                have: self.content_size() as usize,
            });
        }
        match &self.payload {
            Payload::Source { offset: base, .. } => Ok(read_slice(src, base + offset, len)?),
            Payload::Owned(v) => Ok(v[offset as usize..end as usize].to_vec()),
        }
    }
}

/// A box whose payload is a sequence of boxes, optionally preceded by fixed
/// fields (`preamble`), e.g. the entry count of `stsd` or the 78 bytes of a
/// visual sample entry.
#[derive(Debug, Clone)]
pub struct Container {
    pub name: FourCC,
    pub header: HeaderKind,
    pub start: Option<u64>,
    pub preamble: Vec<u8>,
    children: Vec<Node>,
    content_size: u64,
}

impl Container {
    pub fn new(name: FourCC) -> Self {
        Self::with_preamble(name, Vec::new())
    }

    pub fn with_preamble(name: FourCC, preamble: Vec<u8>) -> Self {
        Self::from_parts(name, HeaderKind::Compact, None, preamble, Vec::new())
    }

    pub(crate) fn from_parts(
        name: FourCC,
        header: HeaderKind,
        start: Option<u64>,
        preamble: Vec<u8>,
        children: Vec<Node>,
    ) -> Self {
        let mut c = Self { name, header, start, preamble, children, content_size: 0 };
        c.recount();
        c
    }

    pub fn header_size(&self) -> u64 {
        self.header.header_size()
    }

    pub fn content_size(&self) -> u64 {
        self.content_size
    }

    pub fn size(&self) -> u64 {
        self.header_size() + self.content_size
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Node] {
        &mut self.children
    }

    /// Append `child` after the existing children.
    pub fn add(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
        self.recount();
    }

    /// Remove the first child tagged `tag`. Absent tags are not an error.
    pub fn remove(&mut self, tag: FourCC) -> Option<Node> {
        let idx = self.children.iter().position(|c| c.name() == tag)?;
        let removed = self.children.remove(idx);
        self.recount();
        Some(removed)
    }

    pub fn find_first(&self, tag: FourCC) -> Option<&Node> {
        self.children.iter().find(|c| c.name() == tag)
    }

    pub fn find_first_mut(&mut self, tag: FourCC) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.name() == tag)
    }

    pub fn find_all(&self, tag: FourCC) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(move |c| c.name() == tag)
    }

    pub fn find_all_mut(&mut self, tag: FourCC) -> impl Iterator<Item = &mut Node> {
        self.children.iter_mut().filter(move |c| c.name() == tag)
    }

    /// Recompute sizes bottom-up over the whole subtree. Call once after a
    /// batch of mutations made through `children_mut`.
    pub fn resize(&mut self) {
        for child in &mut self.children {
            if let Node::Container(c) = child {
                c.resize();
            }
        }
        fit_headers(&mut self.children);
        self.recount();
    }

    fn recount(&mut self) {
        self.content_size = self.preamble.len() as u64
            + self.children.iter().map(Node::size).sum::<u64>();
        self.header = self.header.fit(self.content_size);
    }
}

/// Only the last box of a sibling list may keep a run-to-end size field.
pub(crate) fn fit_headers(nodes: &mut [Node]) {
    let last = nodes.len().saturating_sub(1);
    for (i, node) in nodes.iter_mut().enumerate() {
        let content = node.content_size();
        let header = node.header_mut();
        *header = match *header {
            HeaderKind::ToEnd if i != last => HeaderKind::Compact.fit(content),
            other => other.fit(content),
        };
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Leaf(Mp4Box),
    Container(Container),
}

impl Node {
    pub fn name(&self) -> FourCC {
        match self {
            Node::Leaf(b) => b.name,
            Node::Container(c) => c.name,
        }
    }

    pub fn header(&self) -> HeaderKind {
        match self {
            Node::Leaf(b) => b.header,
            Node::Container(c) => c.header,
        }
    }

    fn header_mut(&mut self) -> &mut HeaderKind {
        match self {
            Node::Leaf(b) => &mut b.header,
            Node::Container(c) => &mut c.header,
        }
    }

    pub fn header_size(&self) -> u64 {
        self.header().header_size()
    }

    pub fn content_size(&self) -> u64 {
        match self {
            Node::Leaf(b) => b.content_size(),
            Node::Container(c) => c.content_size(),
        }
    }

    pub fn size(&self) -> u64 {
        self.header_size() + self.content_size()
    }

    /// Header offset in the source file.
    pub fn start(&self) -> Option<u64> {
        match self {
            Node::Leaf(b) => b.start,
            Node::Container(c) => c.start,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Node::Container(_))
    }

    pub fn as_leaf(&self) -> Option<&Mp4Box> {
        match self {
            Node::Leaf(b) => Some(b),
            Node::Container(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut Mp4Box> {
        match self {
            Node::Leaf(b) => Some(b),
            Node::Container(_) => None,
        }
    }

    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Node::Container(c) => Some(c),
            Node::Leaf(_) => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut Container> {
        match self {
            Node::Container(c) => Some(c),
            Node::Leaf(_) => None,
        }
    }
}

impl From<Mp4Box> for Node {
    fn from(b: Mp4Box) -> Self {
        Node::Leaf(b)
    }
}

impl From<Container> for Node {
    fn from(c: Container) -> Self {
        Node::Container(c)
    }
}
