//! Production metadata (`prmd`) and its references (`prmr`) in video tracks.
//!
//! A `prmd` box in a track's `udta` carries the serialized [`Lut3d`]; a `prmr`
//! box in each visual sample entry of that track carries the same connection
//! UUID so a decoder can tie the sample description to the metadata.

use crate::boxes::{Container, Mp4Box, Node};
use crate::error::{Error, Result};
use crate::known_boxes::{KnownBox, HANDLER_VIDE, HDLR, MDIA, MINF, PRMD, PRMR, STBL, STSD, TRAK, UDTA};
use crate::lut3d::Lut3d;
use crate::mpeg4::Mpeg4Container;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const MPEG_FILE_EXTENSIONS: [&str; 2] = ["mp4", "mov"];

/// version+flags followed by the connection UUID
pub const PRMR_CONTENT_SIZE: u64 = 20;

pub fn prmr_box(connection_uuid: &Uuid) -> Mp4Box {
    let mut contents = vec![0u8; 4];
    contents.extend_from_slice(connection_uuid.as_bytes());
    Mp4Box::new(PRMR, contents)
}

pub fn prmd_box(lut3d: &Lut3d) -> Result<Mp4Box> {
    Ok(Mp4Box::new(PRMD, lut3d.to_prmd_contents()?))
}

/// A `udta` container holding a single `prmd` box.
pub fn udta_box(prmd: Mp4Box) -> Container {
    let mut udta = Container::new(UDTA);
    udta.add(prmd);
    udta
}

/// Does `trak` declare a `vide` handler in `mdia/hdlr`?
pub fn is_video_track<R: Read + Seek>(trak: &Container, src: &mut R) -> Result<bool> {
    for mdia in trak.find_all(MDIA).filter_map(Node::as_container) {
        for hdlr in mdia.find_all(HDLR).filter_map(Node::as_leaf) {
            // version+flags (4), pre_defined (4), handler_type (4)
            if hdlr.content_size() < 12 {
                continue;
            }
            if hdlr.read_range(src, 8, 4)? == HANDLER_VIDE {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Visual sample entries under `mdia/minf/stbl/stsd`.
pub fn visual_sample_entries(trak: &Container) -> impl Iterator<Item = &Container> {
    trak.find_all(MDIA)
        .filter_map(Node::as_container)
        .flat_map(|mdia| mdia.find_all(MINF).filter_map(Node::as_container))
        .flat_map(|minf| minf.find_all(STBL).filter_map(Node::as_container))
        .flat_map(|stbl| stbl.find_all(STSD).filter_map(Node::as_container))
        .flat_map(|stsd| stsd.children().iter().filter_map(Node::as_container))
        .filter(|entry| KnownBox::from(entry.name).is_visual_sample_entry())
}

fn visual_sample_entries_mut(trak: &mut Container) -> impl Iterator<Item = &mut Container> {
    trak.find_all_mut(MDIA)
        .filter_map(Node::as_container_mut)
        .flat_map(|mdia| mdia.find_all_mut(MINF).filter_map(Node::as_container_mut))
        .flat_map(|minf| minf.find_all_mut(STBL).filter_map(Node::as_container_mut))
        .flat_map(|stbl| stbl.find_all_mut(STSD).filter_map(Node::as_container_mut))
        .flat_map(|stsd| stsd.children_mut().iter_mut().filter_map(Node::as_container_mut))
        .filter(|entry| KnownBox::from(entry.name).is_visual_sample_entry())
}

/// Attach `lut3d` to every video track of `file`, replacing any earlier
/// `prmr`/`prmd` boxes. Returns the number of tracks updated.
pub fn inject_lut3d<R: Read + Seek>(file: &mut Mpeg4Container, src: &mut R, lut3d: &Lut3d) -> Result<usize> {
    let prmd = prmd_box(lut3d)?;
    let mut tracks = 0;

    for trak in file.moov_mut().find_all_mut(TRAK).filter_map(Node::as_container_mut) {
        if !is_video_track(trak, src)? {
            continue;
        }

        for entry in visual_sample_entries_mut(trak) {
            entry.remove(PRMR);
            entry.add(prmr_box(&lut3d.connection_uuid));
            tracing::debug!(entry = %entry.name, "added prmr to visual sample entry");
        }

        if let Some(udta) = trak.find_first_mut(UDTA).and_then(Node::as_container_mut) {
            udta.remove(PRMD);
            udta.add(prmd.clone());
            tracing::debug!("added prmd to existing udta");
        } else {
            trak.add(udta_box(prmd.clone()));
            tracing::debug!("added udta with prmd");
        }
        tracks += 1;
    }

    if tracks == 0 {
        return Err(Error::NoVideoTrack);
    }
    file.resize();
    tracing::info!(tracks, uuid = %lut3d.connection_uuid, "injected lut3d");
    Ok(tracks)
}

/// Find the first decodable `prmd` in a video track of `file`.
///
/// A `prmd` whose UUID matches no `prmr` is still returned, with a warning.
pub fn extract_lut3d<R: Read + Seek>(file: &Mpeg4Container, src: &mut R) -> Result<Option<Lut3d>> {
    let mut refs: Vec<Uuid> = Vec::new();
    let mut candidates: Vec<&Mp4Box> = Vec::new();

    for trak in file.moov().find_all(TRAK).filter_map(Node::as_container) {
        if !is_video_track(trak, src)? {
            continue;
        }
        for entry in visual_sample_entries(trak) {
            for prmr in entry.find_all(PRMR).filter_map(Node::as_leaf) {
                if prmr.content_size() != PRMR_CONTENT_SIZE {
                    tracing::warn!(
                        size = prmr.content_size(),
                        "prmr box is not {} bytes, skipped",
                        PRMR_CONTENT_SIZE
                    );
                    continue;
                }
                let uuid = prmr.read_range(src, 4, 16)?;
                refs.push(Uuid::from_slice(&uuid).map_err(|e| Error::malformed(e.to_string()))?);
            }
        }
        for udta in trak.find_all(UDTA).filter_map(Node::as_container) {
            candidates.extend(udta.find_all(PRMD).filter_map(Node::as_leaf));
        }
    }

    for prmd in candidates {
        let contents = prmd.read_contents(src)?;
        match Lut3d::from_prmd_contents(&contents) {
            Ok(lut3d) => {
                if !refs.contains(&lut3d.connection_uuid) {
                    tracing::warn!(uuid = %lut3d.connection_uuid, "no prmr references the parsed lut3d");
                }
                tracing::info!(uuid = %lut3d.connection_uuid, size = lut3d.size(), "found lut3d");
                return Ok(Some(lut3d));
            }
            Err(e) => tracing::warn!(offset = ?prmd.start, "skipping prmd: {}", e),
        }
    }
    Ok(None)
}

/// Inject `lut3d` into `input` and write the result to `output`.
///
/// Nothing is written to `output` unless the whole file was produced.
pub fn inject_lut3d_file(input: impl AsRef<Path>, output: impl AsRef<Path>, lut3d: &Lut3d) -> Result<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    let resolved = resolve(input)?;
    if resolved == resolve(output)? {
        return Err(Error::SameInputOutputPath(resolved));
    }
    check_extension(input)?;

    tracing::info!(input = %input.display(), "processing");
    let mut src = BufReader::new(File::open(input)?);
    let mut file = Mpeg4Container::load(&mut src)?;
    inject_lut3d(&mut file, &mut src, lut3d)?;

    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        file.save(&mut src, &mut w)?;
        w.flush()?;
    }
    tmp.persist(output).map_err(|e| Error::Io(e.error))?;

    tracing::info!(output = %output.display(), "injected lut3d");
    Ok(())
}

/// Read the first lut3d stored in `input`, if any.
pub fn parse_lut3d_file(input: impl AsRef<Path>) -> Result<Option<Lut3d>> {
    let input = input.as_ref();
    check_extension(input)?;

    tracing::info!(input = %input.display(), "parsing");
    let mut src = BufReader::new(File::open(input)?);
    let file = Mpeg4Container::load(&mut src)?;
    extract_lut3d(&file, &mut src)
}

pub fn check_extension(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext {
        Some(e) if MPEG_FILE_EXTENSIONS.contains(&e.as_str()) => Ok(()),
        _ => Err(Error::UnsupportedFileType(path.to_path_buf())),
    }
}

/// Absolute form of `path`, following symlinks for whatever part exists.
fn resolve(path: &Path) -> io::Result<PathBuf> {
    if let Ok(p) = path.canonicalize() {
        return Ok(p);
    }
    let abs = std::path::absolute(path)?;
    match (abs.parent(), abs.file_name()) {
        (Some(parent), Some(name)) => match parent.canonicalize() {
            Ok(parent) => Ok(parent.join(name)),
            Err(_) => Ok(abs),
        },
        _ => Ok(abs),
    }
}
