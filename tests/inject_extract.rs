mod common;

use common::*;
use mp4lut3d::boxes::{Container, FourCC, Node};
use mp4lut3d::known_boxes::{PRMD, PRMR, STSD, UDTA};
use mp4lut3d::production::{visual_sample_entries, PRMR_CONTENT_SIZE};
use mp4lut3d::{
    extract_lut3d, inject_lut3d, inject_lut3d_file, parse_lut3d_file, ColourPrimaries,
    ColourTransferCharacteristics, CubeFile, Error, Lut3d,
};
use std::fs;
use std::io::Cursor;
use tempfile::tempdir;
use uuid::Uuid;

fn inject_in_memory(data: &[u8], lut: &Lut3d) -> Vec<u8> {
    let (mut file, mut src) = load(data);
    let tracks = inject_lut3d(&mut file, &mut src, lut).expect("inject failed");
    assert_eq!(tracks, 1);
    save(&mut file, &mut src)
}

fn extract(data: &[u8]) -> Option<Lut3d> {
    let (file, mut src) = load(data);
    extract_lut3d(&file, &mut src).expect("extract failed")
}

#[test]
fn inject_then_extract() {
    let movie = build_movie(&MovieOptions::default());
    let lut = sample_lut(4);
    let out = inject_in_memory(&movie.data, &lut);

    let parsed = extract(&out).expect("lut3d present");
    assert_eq!(parsed.connection_uuid, lut.connection_uuid);
    assert_eq!(parsed.output_colour_primaries, lut.output_colour_primaries);
    assert_eq!(
        parsed.output_colour_transfer_characteristics,
        lut.output_colour_transfer_characteristics
    );
    assert_lut_close(&parsed, &lut);
}

#[test]
fn injected_boxes_land_in_video_track_only() {
    let movie = build_movie(&MovieOptions::default());
    let lut = sample_lut(2);
    let out = inject_in_memory(&movie.data, &lut);
    let (file, mut src) = load(&out);

    let video = track(&file, &mut src, b"vide").unwrap();
    let entries: Vec<&Container> = visual_sample_entries(video).collect();
    assert_eq!(entries.len(), 1);
    let prmr = entries[0].children().last().and_then(Node::as_leaf).unwrap();
    assert_eq!(prmr.name, PRMR);
    assert_eq!(prmr.content_size(), PRMR_CONTENT_SIZE);
    assert_eq!(prmr.read_range(&mut src, 4, 16).unwrap(), lut.connection_uuid.as_bytes());
    // codec config is kept ahead of the reference
    assert_eq!(entries[0].children()[0].name(), FourCC(*b"avcC"));
    assert_eq!(entries[0].preamble.len(), 78);

    let udta = container_at(video, &[UDTA]).expect("udta added");
    assert_eq!(udta.children().len(), 1);
    assert_eq!(udta.children()[0].name(), PRMD);

    let audio = track(&file, &mut src, b"soun").unwrap();
    assert!(audio.find_first(UDTA).is_none());
    let stsd = container_at(audio, &[STBL_PATH.as_slice(), &[STSD][..]].concat()).unwrap();
    let mp4a = stsd.children()[0].as_container().unwrap();
    assert!(mp4a.find_first(PRMR).is_none());
}

#[test]
fn second_injection_replaces_the_first() {
    let movie = build_movie(&MovieOptions::default());
    let first = sample_lut(2);
    let second = sample_lut(3);
    let once = inject_in_memory(&movie.data, &first);
    let twice = inject_in_memory(&once, &second);

    let (file, mut src) = load(&twice);
    let video = track(&file, &mut src, b"vide").unwrap();
    for entry in visual_sample_entries(video) {
        assert_eq!(entry.find_all(PRMR).count(), 1);
    }
    assert_eq!(video.find_all(UDTA).count(), 1);
    let udta = container_at(video, &[UDTA]).unwrap();
    assert_eq!(udta.find_all(PRMD).count(), 1);

    let parsed = extract(&twice).unwrap();
    assert_eq!(parsed.connection_uuid, second.connection_uuid);
    assert_eq!(parsed.size(), 3);

    // same payload size, so the file does not grow again
    let thrice = inject_in_memory(&twice, &second);
    assert_eq!(thrice.len(), twice.len());
}

#[test]
fn existing_udta_is_reused() {
    let movie = build_movie(&MovieOptions { video_udta: true, ..Default::default() });
    let lut = sample_lut(2);
    let out = inject_in_memory(&movie.data, &lut);

    let (file, mut src) = load(&out);
    let video = track(&file, &mut src, b"vide").unwrap();
    assert_eq!(video.find_all(UDTA).count(), 1);
    let udta = container_at(video, &[UDTA]).unwrap();
    let names: Vec<FourCC> = udta.children().iter().map(Node::name).collect();
    assert_eq!(names, [FourCC(*b"name"), PRMD]);

    let name = udta.children()[0].as_leaf().unwrap();
    assert_eq!(name.read_contents(&mut src).unwrap(), b"camera A");
    assert_eq!(extract(&out).unwrap().connection_uuid, lut.connection_uuid);
}

#[test]
fn audio_only_file_has_no_video_track() {
    let movie = build_movie(&MovieOptions { audio_only: true, ..Default::default() });
    let (mut file, mut src) = load(&movie.data);
    let size = file.size();

    let err = inject_lut3d(&mut file, &mut src, &sample_lut(2)).unwrap_err();
    assert!(matches!(err, Error::NoVideoTrack), "{err}");
    assert_eq!(file.size(), size);
}

#[test]
fn uninjected_file_has_no_lut() {
    let movie = build_movie(&MovieOptions { video_udta: true, ..Default::default() });
    assert!(extract(&movie.data).is_none());
}

fn video_entry_mut(file: &mut mp4lut3d::Mpeg4Container) -> &mut Container {
    let path = [mp4lut3d::known_boxes::TRAK]
        .into_iter()
        .chain(STBL_PATH)
        .chain([STSD])
        .collect::<Vec<_>>();
    let stsd = container_at_mut(file.moov_mut(), &path).expect("video stsd");
    stsd.children_mut()[0].as_container_mut().expect("avc1")
}

#[test]
fn unreferenced_prmd_is_still_extracted() {
    let movie = build_movie(&MovieOptions::default());
    let lut = sample_lut(2);
    let out = inject_in_memory(&movie.data, &lut);

    let (mut file, mut src) = load(&out);
    let entry = video_entry_mut(&mut file);
    let prmr = entry.find_first_mut(PRMR).and_then(Node::as_leaf_mut).unwrap();
    let mut contents = vec![0u8; 4];
    contents.extend_from_slice(Uuid::new_v4().as_bytes());
    prmr.set_contents(contents);
    let edited = save(&mut file, &mut src);

    let parsed = extract(&edited).expect("prmd still parsed");
    assert_eq!(parsed.connection_uuid, lut.connection_uuid);
}

#[test]
fn undecodable_prmd_is_skipped() {
    let movie = build_movie(&MovieOptions::default());
    let out = inject_in_memory(&movie.data, &sample_lut(2));

    let (mut file, mut src) = load(&out);
    let udta = file
        .moov_mut()
        .find_first_mut(mp4lut3d::known_boxes::TRAK)
        .and_then(Node::as_container_mut)
        .and_then(|t| t.find_first_mut(UDTA))
        .and_then(Node::as_container_mut)
        .unwrap();
    let prmd = udta.find_first_mut(PRMD).and_then(Node::as_leaf_mut).unwrap();
    let mut contents = prmd.read_contents(&mut src).unwrap();
    contents[20..24].copy_from_slice(b"lut1");
    prmd.set_contents(contents);
    let edited = save(&mut file, &mut src);

    assert!(extract(&edited).is_none());
}

#[test]
fn file_level_inject_and_parse() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("clip.mp4");
    let output = dir.path().join("graded.MOV");
    let cube_path = dir.path().join("look.cube");

    let movie = build_movie(&MovieOptions::default());
    fs::write(&input, &movie.data).unwrap();
    fs::write(&cube_path, identity_cube_text(3)).unwrap();

    let cube = CubeFile::from_path(&cube_path).unwrap();
    let mut lut = Lut3d::new(ColourPrimaries::Bt709, ColourTransferCharacteristics::Bt709);
    lut.load_cube(&cube).unwrap();

    inject_lut3d_file(&input, &output, &lut).unwrap();
    assert_eq!(fs::read(&input).unwrap(), movie.data);

    let parsed = parse_lut3d_file(&output).unwrap().expect("lut3d present");
    assert_eq!(parsed.connection_uuid, lut.connection_uuid);
    assert_lut_close(&parsed, &lut);
    assert!(parse_lut3d_file(&input).unwrap().is_none());

    let retrieved = dir.path().join("retrieved.cube");
    parsed.to_cube().write_to_path(&retrieved).unwrap();
    let back = CubeFile::from_path(&retrieved).unwrap();
    assert_eq!(back.size, 3);
    assert_eq!(back.entries.len(), 27);
}

#[test]
fn unsupported_extensions_are_rejected() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("clip.avi");
    fs::write(&input, build_movie(&MovieOptions::default()).data).unwrap();
    let lut = sample_lut(2);

    let err = inject_lut3d_file(&input, dir.path().join("out.mp4"), &lut).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFileType(_)), "{err}");

    let err = parse_lut3d_file(&input).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFileType(_)), "{err}");

    let err = parse_lut3d_file(dir.path().join("noext")).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFileType(_)), "{err}");
}

#[test]
fn same_input_and_output_is_rejected() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("clip.mp4");
    let movie = build_movie(&MovieOptions::default());
    fs::write(&input, &movie.data).unwrap();
    let lut = sample_lut(2);

    let err = inject_lut3d_file(&input, &input, &lut).unwrap_err();
    assert!(matches!(err, Error::SameInputOutputPath(_)), "{err}");

    let dotted = dir.path().join(".").join("clip.mp4");
    let err = inject_lut3d_file(&input, &dotted, &lut).unwrap_err();
    assert!(matches!(err, Error::SameInputOutputPath(_)), "{err}");
    assert_eq!(fs::read(&input).unwrap(), movie.data);
}

#[test]
fn failed_inject_leaves_no_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.mp4");
    let output = dir.path().join("out.mp4");
    let data = [bx(b"ftyp", b"isom\0\0\0\0"), bx(b"mdat", &[1, 2, 3])].concat();
    fs::write(&input, data).unwrap();

    let err = inject_lut3d_file(&input, &output, &sample_lut(2)).unwrap_err();
    assert!(matches!(err, Error::CorruptFile(_)), "{err}");
    assert!(!output.exists());

    let audio_only = dir.path().join("audio.mp4");
    fs::write(&audio_only, build_movie(&MovieOptions { audio_only: true, ..Default::default() }).data).unwrap();
    let err = inject_lut3d_file(&audio_only, &output, &sample_lut(2)).unwrap_err();
    assert!(matches!(err, Error::NoVideoTrack), "{err}");
    assert!(!output.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn extraction_reads_from_any_source() {
    let movie = build_movie(&MovieOptions { mdat_header: MdatHeader::Large, ..Default::default() });
    let lut = sample_lut(2);
    let out = inject_in_memory(&movie.data, &lut);

    let mut src = Cursor::new(out);
    let file = mp4lut3d::Mpeg4Container::load(&mut src).unwrap();
    let parsed = extract_lut3d(&file, &mut src).unwrap().unwrap();
    assert_eq!(parsed.connection_uuid, lut.connection_uuid);
}
