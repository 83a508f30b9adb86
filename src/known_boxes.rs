use crate::boxes::FourCC;

pub const FTYP: FourCC = FourCC(*b"ftyp");
pub const FREE: FourCC = FourCC(*b"free");
pub const MDAT: FourCC = FourCC(*b"mdat");
pub const MOOV: FourCC = FourCC(*b"moov");
pub const TRAK: FourCC = FourCC(*b"trak");
pub const MDIA: FourCC = FourCC(*b"mdia");
pub const HDLR: FourCC = FourCC(*b"hdlr");
pub const MINF: FourCC = FourCC(*b"minf");
pub const STBL: FourCC = FourCC(*b"stbl");
pub const STSD: FourCC = FourCC(*b"stsd");
pub const STCO: FourCC = FourCC(*b"stco");
pub const CO64: FourCC = FourCC(*b"co64");
pub const UDTA: FourCC = FourCC(*b"udta");
pub const PRMR: FourCC = FourCC(*b"prmr");
pub const PRMD: FourCC = FourCC(*b"prmd");

/// `hdlr` handler type of a video track.
pub const HANDLER_VIDE: [u8; 4] = *b"vide";

/// Fixed fields in front of the child boxes of `stsd`: version+flags, entry_count.
pub const STSD_PREAMBLE: usize = 8;
/// Fixed fields of a VisualSampleEntry before its child boxes.
pub const VISUAL_SAMPLE_ENTRY_PREAMBLE: usize = 78;
/// Fixed fields of a version 0 sound sample description.
pub const SOUND_SAMPLE_DESCRIPTION_PREAMBLE: usize = 28;

/// Typed view over the boxes this crate needs to tell apart.
///
/// Anything not in this list becomes `KnownBox::Unknown(fourcc)` and is kept
/// as an opaque leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    // File-level
    Ftyp,
    Free,
    Mdat,
    Moov,

    // Structure
    Trak,
    Mdia,
    Hdlr,
    Minf,
    Stbl,
    Stsd,
    Udta,
    Wave,

    // Chunk offsets
    Stco,
    Co64,

    // Production metadata
    Prmr,
    Prmd,

    // Visual sample entries
    Avc1,
    Avc3,
    Mp4v,
    Encv,
    S263,
    Vp09,
    Av01,
    Hev1,
    Hvc1,
    Dvh1,
    Dvhe,

    // Sound sample descriptions
    NoneCodec,
    Raw,
    Twos,
    Sowt,
    Fl32,
    Fl64,
    In24,
    In32,
    Ulaw,
    Alaw,
    Lpcm,
    Mp4a,
    Opus,

    Unknown(FourCC),
}

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"ftyp" => KnownBox::Ftyp,
            b"free" => KnownBox::Free,
            b"mdat" => KnownBox::Mdat,
            b"moov" => KnownBox::Moov,

            b"trak" => KnownBox::Trak,
            b"mdia" => KnownBox::Mdia,
            b"hdlr" => KnownBox::Hdlr,
            b"minf" => KnownBox::Minf,
            b"stbl" => KnownBox::Stbl,
            b"stsd" => KnownBox::Stsd,
            b"udta" => KnownBox::Udta,
            b"wave" => KnownBox::Wave,

            b"stco" => KnownBox::Stco,
            b"co64" => KnownBox::Co64,

            b"prmr" => KnownBox::Prmr,
            b"prmd" => KnownBox::Prmd,

            b"avc1" => KnownBox::Avc1,
            b"avc3" => KnownBox::Avc3,
            b"mp4v" => KnownBox::Mp4v,
            b"encv" => KnownBox::Encv,
            b"s263" => KnownBox::S263,
            b"vp09" => KnownBox::Vp09,
            b"av01" => KnownBox::Av01,
            b"hev1" => KnownBox::Hev1,
            b"hvc1" => KnownBox::Hvc1,
            b"dvh1" => KnownBox::Dvh1,
            b"dvhe" => KnownBox::Dvhe,

            b"NONE" => KnownBox::NoneCodec,
            b"raw " => KnownBox::Raw,
            b"twos" => KnownBox::Twos,
            b"sowt" => KnownBox::Sowt,
            b"fl32" => KnownBox::Fl32,
            b"fl64" => KnownBox::Fl64,
            b"in24" => KnownBox::In24,
            b"in32" => KnownBox::In32,
            b"ulaw" => KnownBox::Ulaw,
            b"alaw" => KnownBox::Alaw,
            b"lpcm" => KnownBox::Lpcm,
            b"mp4a" => KnownBox::Mp4a,
            b"Opus" => KnownBox::Opus,

            _ => KnownBox::Unknown(cc),
        }
    }
}

impl KnownBox {
    /// Plain containers: the payload is nothing but child boxes.
    pub fn is_plain_container(&self) -> bool {
        matches!(
            self,
            KnownBox::Moov
                | KnownBox::Trak
                | KnownBox::Mdia
                | KnownBox::Minf
                | KnownBox::Stbl
                | KnownBox::Udta
                | KnownBox::Wave
        )
    }

    /// Does this box *contain* child boxes, possibly after fixed fields?
    pub fn is_container(&self) -> bool {
        self.is_plain_container()
            || *self == KnownBox::Stsd
            || self.is_visual_sample_entry()
            || self.is_sound_sample_description()
    }

    pub fn is_visual_sample_entry(&self) -> bool {
        matches!(
            self,
            KnownBox::Avc1
                | KnownBox::Avc3
                | KnownBox::Mp4v
                | KnownBox::Encv
                | KnownBox::S263
                | KnownBox::Vp09
                | KnownBox::Av01
                | KnownBox::Hev1
                | KnownBox::Hvc1
                | KnownBox::Dvh1
                | KnownBox::Dvhe
        )
    }

    pub fn is_sound_sample_description(&self) -> bool {
        matches!(
            self,
            KnownBox::NoneCodec
                | KnownBox::Raw
                | KnownBox::Twos
                | KnownBox::Sowt
                | KnownBox::Fl32
                | KnownBox::Fl64
                | KnownBox::In24
                | KnownBox::In32
                | KnownBox::Ulaw
                | KnownBox::Alaw
                | KnownBox::Lpcm
                | KnownBox::Mp4a
                | KnownBox::Opus
        )
    }

    /// Chunk offset tables holding absolute file positions.
    pub fn is_chunk_offset_table(&self) -> bool {
        matches!(self, KnownBox::Stco | KnownBox::Co64)
    }

    /// Length of the fixed fields preceding the children of a sound sample
    /// description with the given QuickTime version, `None` for versions we
    /// cannot lay out (the entry is then kept opaque).
    pub fn sound_preamble_len(version: u16) -> Option<usize> {
        match version {
            0 => Some(SOUND_SAMPLE_DESCRIPTION_PREAMBLE),
            1 => Some(SOUND_SAMPLE_DESCRIPTION_PREAMBLE + 16),
            2 => Some(SOUND_SAMPLE_DESCRIPTION_PREAMBLE + 36),
            _ => None,
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::Ftyp => "File Type Box",
            KnownBox::Free => "Free Space Box",
            KnownBox::Mdat => "Media Data Box",
            KnownBox::Moov => "Movie Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Hdlr => "Handler Reference Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Stsd => "Sample Description Box",
            KnownBox::Udta => "User Data Box",
            KnownBox::Wave => "QuickTime Sound Extension",
            KnownBox::Stco => "Chunk Offset Box",
            KnownBox::Co64 => "64-bit Chunk Offset Box",
            KnownBox::Prmr => "Production Metadata Reference Box",
            KnownBox::Prmd => "Production Metadata Box",
            k if k.is_visual_sample_entry() => "Visual Sample Entry",
            k if k.is_sound_sample_description() => "Sound Sample Description",
            _ => "Unknown Box",
        }
    }
}
