#![allow(dead_code)]

use mp4lut3d::boxes::{Container, FourCC, Node};
use mp4lut3d::known_boxes::{CO64, HDLR, MDIA, MINF, STBL, STCO, TRAK};
use mp4lut3d::offsets::chunk_offsets;
use mp4lut3d::{ColourPrimaries, ColourTransferCharacteristics, Lut3d, Mpeg4Container};
use std::io::Cursor;

pub const VIDEO_CHUNKS: [&[u8]; 3] = [b"video chunk zero", b"video chunk one!", b"video chunk two.."];
pub const AUDIO_CHUNKS: [&[u8]; 2] = [b"audio chunk 0", b"audio chunk 1"];

/// Entry of the `stco` placed in a video `udta` by `MovieOptions::stray_table`.
pub const STRAY_OFFSET: u64 = 12345;

/// Largest error a value picks up going through the 15-bit fixed point.
pub const TOLERANCE: f64 = 1.0 / 65536.0;

pub const STBL_PATH: [FourCC; 3] = [MDIA, MINF, STBL];

pub fn bx(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(8 + payload.len());
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(tag);
    v.extend_from_slice(payload);
    v
}

/// Box with a 64-bit size field.
pub fn large_bx(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(16 + payload.len());
    v.extend_from_slice(&1u32.to_be_bytes());
    v.extend_from_slice(tag);
    v.extend_from_slice(&(16 + payload.len() as u64).to_be_bytes());
    v.extend_from_slice(payload);
    v
}

/// Box with size field 0, running to the end of its parent.
pub fn to_end_bx(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(8 + payload.len());
    v.extend_from_slice(&0u32.to_be_bytes());
    v.extend_from_slice(tag);
    v.extend_from_slice(payload);
    v
}

/// Box whose payload starts with a zero version+flags word.
pub fn full_box(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    bx(tag, &[&[0u8; 4][..], payload].concat())
}

pub fn container(tag: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    bx(tag, &children.concat())
}

pub fn hdlr(handler: &[u8; 4]) -> Vec<u8> {
    let mut p = vec![0u8; 4]; // pre_defined
    p.extend_from_slice(handler);
    p.extend_from_slice(&[0u8; 12]);
    p.extend_from_slice(b"handler\0");
    full_box(b"hdlr", &p)
}

pub fn visual_entry(tag: &[u8; 4]) -> Vec<u8> {
    let mut p = vec![0u8; 78];
    p[7] = 1; // data_reference_index
    p[16..18].copy_from_slice(&1920u16.to_be_bytes());
    p[18..20].copy_from_slice(&1080u16.to_be_bytes());
    p.extend(bx(b"avcC", &[1, 0x64, 0, 0x28]));
    bx(tag, &p)
}

/// QuickTime sound description with an `esds` child. Unknown versions get
/// the version 0 layout.
pub fn sound_entry(tag: &[u8; 4], version: u16) -> Vec<u8> {
    let len = match version {
        1 => 44,
        2 => 64,
        _ => 28,
    };
    let mut p = vec![0u8; len];
    p[7] = 1;
    p[8..10].copy_from_slice(&version.to_be_bytes());
    p.extend(bx(b"esds", &[0u8; 12]));
    bx(tag, &p)
}

pub fn stsd(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut p = (entries.len() as u32).to_be_bytes().to_vec();
    p.extend(entries.concat());
    full_box(b"stsd", &p)
}

pub fn stco(offsets: &[u64]) -> Vec<u8> {
    let mut p = (offsets.len() as u32).to_be_bytes().to_vec();
    for &o in offsets {
        p.extend_from_slice(&(o as u32).to_be_bytes());
    }
    full_box(b"stco", &p)
}

pub fn co64(offsets: &[u64]) -> Vec<u8> {
    let mut p = (offsets.len() as u32).to_be_bytes().to_vec();
    for &o in offsets {
        p.extend_from_slice(&o.to_be_bytes());
    }
    full_box(b"co64", &p)
}

pub fn trak(handler: &[u8; 4], entry: Vec<u8>, table: Vec<u8>, udta: Option<Vec<u8>>) -> Vec<u8> {
    let stbl = container(b"stbl", &[stsd(&[entry]), full_box(b"stts", &[0u8; 4]), table]);
    let minf = container(b"minf", &[stbl]);
    let mdia = container(b"mdia", &[full_box(b"mdhd", &[0u8; 20]), hdlr(handler), minf]);
    let mut kids = vec![full_box(b"tkhd", &[0u8; 80]), mdia];
    kids.extend(udta);
    container(b"trak", &kids)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MdatHeader {
    #[default]
    Compact,
    Large,
    ToEnd,
}

#[derive(Debug, Clone, Default)]
pub struct MovieOptions {
    pub mdat_header: MdatHeader,
    /// Put `moov` after `mdat`.
    pub moov_last: bool,
    /// Give the video track a `udta` with an unrelated child.
    pub video_udta: bool,
    /// Give the video track a `udta` holding an `stco` that is not a real table.
    pub stray_table: bool,
    /// Leave out the video track.
    pub audio_only: bool,
}

pub struct Movie {
    pub data: Vec<u8>,
    pub video_offsets: Vec<u64>,
    pub audio_offsets: Vec<u64>,
}

/// ftyp, free, moov and mdat (or mdat before moov) with a video track using
/// `stco` and an audio track using `co64`, both pointing into `mdat`.
pub fn build_movie(opts: &MovieOptions) -> Movie {
    assert!(!(opts.moov_last && opts.mdat_header == MdatHeader::ToEnd));

    let ftyp = bx(b"ftyp", b"isom\0\0\x02\0isomavc1");
    let free = bx(b"free", &[0u8; 8]);

    let mdat_payload: Vec<u8> = VIDEO_CHUNKS.iter().chain(AUDIO_CHUNKS.iter()).flat_map(|c| c.iter().copied()).collect();
    let mdat = match opts.mdat_header {
        MdatHeader::Compact => bx(b"mdat", &mdat_payload),
        MdatHeader::Large => large_bx(b"mdat", &mdat_payload),
        MdatHeader::ToEnd => to_end_bx(b"mdat", &mdat_payload),
    };
    let mdat_header = mdat.len() - mdat_payload.len();

    let mut relative = Vec::new();
    let mut pos = 0u64;
    for c in VIDEO_CHUNKS.iter().chain(AUDIO_CHUNKS.iter()) {
        relative.push(pos);
        pos += c.len() as u64;
    }
    let (video_rel, audio_rel) = relative.split_at(VIDEO_CHUNKS.len());

    let placeholder = build_moov(opts, &vec![0; video_rel.len()], &vec![0; audio_rel.len()]);
    let mut payload_start = (ftyp.len() + free.len() + mdat_header) as u64;
    if !opts.moov_last {
        payload_start += placeholder.len() as u64;
    }

    let video_offsets: Vec<u64> = video_rel.iter().map(|r| r + payload_start).collect();
    let audio_offsets: Vec<u64> = audio_rel.iter().map(|r| r + payload_start).collect();
    let moov = build_moov(opts, &video_offsets, &audio_offsets);
    assert_eq!(moov.len(), placeholder.len());

    let data = if opts.moov_last {
        [ftyp, free, mdat, moov].concat()
    } else {
        [ftyp, free, moov, mdat].concat()
    };
    Movie { data, video_offsets, audio_offsets }
}

fn build_moov(opts: &MovieOptions, video: &[u64], audio: &[u64]) -> Vec<u8> {
    let mut kids = vec![full_box(b"mvhd", &[0u8; 96])];
    if !opts.audio_only {
        let udta = (opts.video_udta || opts.stray_table).then(|| {
            let mut children = Vec::new();
            if opts.video_udta {
                children.push(bx(b"name", b"camera A"));
            }
            if opts.stray_table {
                children.push(stco(&[STRAY_OFFSET]));
            }
            container(b"udta", &children)
        });
        kids.push(trak(b"vide", visual_entry(b"avc1"), stco(video), udta));
    }
    kids.push(trak(b"soun", sound_entry(b"mp4a", 0), co64(audio), None));
    container(b"moov", &kids)
}

pub fn load(data: &[u8]) -> (Mpeg4Container, Cursor<Vec<u8>>) {
    let mut src = Cursor::new(data.to_vec());
    let file = Mpeg4Container::load(&mut src).expect("load failed");
    (file, src)
}

pub fn save(file: &mut Mpeg4Container, src: &mut Cursor<Vec<u8>>) -> Vec<u8> {
    let mut out = Vec::new();
    let written = file.save(src, &mut out).expect("save failed");
    assert_eq!(written, out.len() as u64);
    out
}

pub fn container_at<'a>(c: &'a Container, path: &[FourCC]) -> Option<&'a Container> {
    match path.split_first() {
        None => Some(c),
        Some((tag, rest)) => container_at(c.find_first(*tag)?.as_container()?, rest),
    }
}

pub fn container_at_mut<'a>(c: &'a mut Container, path: &[FourCC]) -> Option<&'a mut Container> {
    match path.split_first() {
        None => Some(c),
        Some((tag, rest)) => container_at_mut(c.find_first_mut(*tag)?.as_container_mut()?, rest),
    }
}

fn handler_of(trak: &Container, src: &mut Cursor<Vec<u8>>) -> Option<Vec<u8>> {
    let hdlr = container_at(trak, &[MDIA])?.find_first(HDLR)?.as_leaf()?;
    hdlr.read_range(src, 8, 4).ok()
}

/// The first track whose `hdlr` declares `handler`.
pub fn track<'a>(file: &'a Mpeg4Container, src: &mut Cursor<Vec<u8>>, handler: &[u8; 4]) -> Option<&'a Container> {
    file.moov()
        .find_all(TRAK)
        .filter_map(Node::as_container)
        .find(|t| handler_of(t, src).as_deref() == Some(&handler[..]))
}

/// Decoded chunk offset table of the track with `handler`.
pub fn track_chunk_offsets(data: &[u8], handler: &[u8; 4]) -> Vec<u64> {
    let (file, mut src) = load(data);
    let trak = track(&file, &mut src, handler).expect("no such track");
    let stbl = container_at(trak, &STBL_PATH).expect("no stbl");
    let table = stbl
        .find_first(STCO)
        .or_else(|| stbl.find_first(CO64))
        .and_then(Node::as_leaf)
        .expect("no chunk offset table");
    let bytes = table.read_contents(&mut src).expect("read table");
    chunk_offsets(table.name, &bytes).expect("decode table")
}

pub fn chunk(data: &[u8], offset: u64, len: usize) -> &[u8] {
    &data[offset as usize..offset as usize + len]
}

/// LUT with distinct ramps per channel, stored in payload order.
pub fn sample_lut(n: usize) -> Lut3d {
    let scale = (n - 1) as f64;
    let mut values = Vec::with_capacity(n.pow(3));
    for r in 0..n {
        for g in 0..n {
            for b in 0..n {
                values.push([r as f64 / scale, g as f64 / scale * 0.5, b as f64 / scale * 1.5]);
            }
        }
    }
    let mut lut = Lut3d::new(ColourPrimaries::Bt2020, ColourTransferCharacteristics::SmpteSt2084);
    lut.set_table(n, values).expect("valid table");
    lut
}

/// Identity `.cube` text of size `n`, red changing fastest.
pub fn identity_cube_text(n: usize) -> String {
    let scale = (n - 1) as f64;
    let mut s = format!("TITLE \"identity\"\n# generated\nLUT_3D_SIZE {n}\n");
    for b in 0..n {
        for g in 0..n {
            for r in 0..n {
                s.push_str(&format!("{} {} {}\n", r as f64 / scale, g as f64 / scale, b as f64 / scale));
            }
        }
    }
    s
}

pub fn assert_lut_close(a: &Lut3d, b: &Lut3d) {
    assert_eq!(a.size(), b.size());
    assert_eq!(a.values().len(), b.values().len());
    for (x, y) in a.values().iter().zip(b.values()) {
        for c in 0..3 {
            assert!((x[c] - y[c]).abs() <= TOLERANCE, "{x:?} vs {y:?}");
        }
    }
}
