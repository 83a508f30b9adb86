//! Output colour primaries and transfer characteristics carried in a `prmd`
//! payload. Codes follow ISO/IEC 23091-2 (H.273).

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ColourPrimaries {
    /// Also ITU-R BT1361 / IEC 61966-2-4 / SMPTE RP177 Annex B.
    Bt709 = 1,
    Unspecified = 2,
    Bt470M = 4,
    /// Also ITU-R BT601-6 625 / ITU-R BT1358 625 / ITU-R BT1700 625 PAL & SECAM.
    Bt470Bg = 5,
    /// Also ITU-R BT601-6 525 / ITU-R BT1358 525 / ITU-R BT1700 NTSC.
    Smpte170M = 6,
    Smpte240M = 7,
    /// Colour filters using Illuminant C.
    Film = 8,
    Bt2020 = 9,
    SmpteSt428_1 = 10,
    Smpte431 = 11,
    Smpte432 = 12,
    JedecP22 = 22,
}

impl ColourPrimaries {
    const PREFIX: &'static str = "COLOUR_PRIMARIES_";

    pub const ALL: [ColourPrimaries; 12] = [
        ColourPrimaries::Bt709,
        ColourPrimaries::Unspecified,
        ColourPrimaries::Bt470M,
        ColourPrimaries::Bt470Bg,
        ColourPrimaries::Smpte170M,
        ColourPrimaries::Smpte240M,
        ColourPrimaries::Film,
        ColourPrimaries::Bt2020,
        ColourPrimaries::SmpteSt428_1,
        ColourPrimaries::Smpte431,
        ColourPrimaries::Smpte432,
        ColourPrimaries::JedecP22,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.code() == code)
            .ok_or(Error::InvalidColourCode { kind: "colour primaries", code })
    }

    pub fn name(self) -> &'static str {
        match self {
            ColourPrimaries::Bt709 => "COLOUR_PRIMARIES_BT709",
            ColourPrimaries::Unspecified => "COLOUR_PRIMARIES_UNSPECIFIED",
            ColourPrimaries::Bt470M => "COLOUR_PRIMARIES_BT470M",
            ColourPrimaries::Bt470Bg => "COLOUR_PRIMARIES_BT470BG",
            ColourPrimaries::Smpte170M => "COLOUR_PRIMARIES_SMPTE170M",
            ColourPrimaries::Smpte240M => "COLOUR_PRIMARIES_SMPTE240M",
            ColourPrimaries::Film => "COLOUR_PRIMARIES_FILM",
            ColourPrimaries::Bt2020 => "COLOUR_PRIMARIES_BT2020",
            ColourPrimaries::SmpteSt428_1 => "COLOUR_PRIMARIES_SMPTEST428_1",
            ColourPrimaries::Smpte431 => "COLOUR_PRIMARIES_SMPTE431",
            ColourPrimaries::Smpte432 => "COLOUR_PRIMARIES_SMPTE432",
            ColourPrimaries::JedecP22 => "COLOUR_PRIMARIES_JEDEC_P22",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ColourTransferCharacteristics {
    Bt709 = 1,
    Unspecified = 2,
    /// Also ITU-R BT470M / ITU-R BT1700 625 PAL & SECAM.
    Gamma22 = 4,
    /// Also ITU-R BT470BG.
    Gamma28 = 5,
    /// Also ITU-R BT601-6 525 or 625 / ITU-R BT1358 525 or 625 / ITU-R BT1700 NTSC.
    Smpte170M = 6,
    Smpte240M = 7,
    Linear = 8,
    /// Logarithmic, 100:1 range.
    Log = 9,
    /// Logarithmic, 100 * sqrt(10) : 1 range.
    LogSqrt = 10,
    Iec61966_2_4 = 11,
    /// ITU-R BT1361 extended colour gamut.
    Bt1361Ecg = 12,
    /// sRGB or sYCC.
    Iec61966_2_1 = 13,
    Bt2020_10 = 14,
    Bt2020_12 = 15,
    /// SMPTE ST 2084 (PQ).
    SmpteSt2084 = 16,
    SmpteSt428_1 = 17,
    /// Hybrid log-gamma.
    AribStdB67 = 18,
}

impl ColourTransferCharacteristics {
    const PREFIX: &'static str = "COLOUR_TRANSFER_CHARACTERISTICS_";

    pub const ALL: [ColourTransferCharacteristics; 17] = [
        ColourTransferCharacteristics::Bt709,
        ColourTransferCharacteristics::Unspecified,
        ColourTransferCharacteristics::Gamma22,
        ColourTransferCharacteristics::Gamma28,
        ColourTransferCharacteristics::Smpte170M,
        ColourTransferCharacteristics::Smpte240M,
        ColourTransferCharacteristics::Linear,
        ColourTransferCharacteristics::Log,
        ColourTransferCharacteristics::LogSqrt,
        ColourTransferCharacteristics::Iec61966_2_4,
        ColourTransferCharacteristics::Bt1361Ecg,
        ColourTransferCharacteristics::Iec61966_2_1,
        ColourTransferCharacteristics::Bt2020_10,
        ColourTransferCharacteristics::Bt2020_12,
        ColourTransferCharacteristics::SmpteSt2084,
        ColourTransferCharacteristics::SmpteSt428_1,
        ColourTransferCharacteristics::AribStdB67,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or(Error::InvalidColourCode { kind: "colour transfer characteristics", code })
    }

    pub fn name(self) -> &'static str {
        use ColourTransferCharacteristics as T;
        match self {
            T::Bt709 => "COLOUR_TRANSFER_CHARACTERISTICS_BT709",
            T::Unspecified => "COLOUR_TRANSFER_CHARACTERISTICS_UNSPECIFIED",
            T::Gamma22 => "COLOUR_TRANSFER_CHARACTERISTICS_GAMMA22",
            T::Gamma28 => "COLOUR_TRANSFER_CHARACTERISTICS_GAMMA28",
            T::Smpte170M => "COLOUR_TRANSFER_CHARACTERISTICS_SMPTE170M",
            T::Smpte240M => "COLOUR_TRANSFER_CHARACTERISTICS_SMPTE240M",
            T::Linear => "COLOUR_TRANSFER_CHARACTERISTICS_LINEAR",
            T::Log => "COLOUR_TRANSFER_CHARACTERISTICS_LOG",
            T::LogSqrt => "COLOUR_TRANSFER_CHARACTERISTICS_LOG_SQRT",
            T::Iec61966_2_4 => "COLOUR_TRANSFER_CHARACTERISTICS_IEC61966_2_4",
            T::Bt1361Ecg => "COLOUR_TRANSFER_CHARACTERISTICS_BT1361_ECG",
            T::Iec61966_2_1 => "COLOUR_TRANSFER_CHARACTERISTICS_IEC61966_2_1",
            T::Bt2020_10 => "COLOUR_TRANSFER_CHARACTERISTICS_BT2020_10",
            T::Bt2020_12 => "COLOUR_TRANSFER_CHARACTERISTICS_BT2020_12",
            T::SmpteSt2084 => "COLOUR_TRANSFER_CHARACTERISTICS_SMPTEST2084",
            T::SmpteSt428_1 => "COLOUR_TRANSFER_CHARACTERISTICS_SMPTEST428_1",
            T::AribStdB67 => "COLOUR_TRANSFER_CHARACTERISTICS_ARIB_STD_B67",
        }
    }
}

/// Match `s` against full constant names, with or without the common prefix.
fn lookup<T: Copy>(s: &str, prefix: &str, all: &[T], name: fn(T) -> &'static str) -> Option<T> {
    let s = s.trim();
    all.iter().copied().find(|&v| {
        let full = name(v);
        full.eq_ignore_ascii_case(s) || full[prefix.len()..].eq_ignore_ascii_case(s)
    })
}

impl FromStr for ColourPrimaries {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        lookup(s, Self::PREFIX, &Self::ALL, Self::name)
            .ok_or_else(|| format!("unknown colour primaries `{s}`"))
    }
}

impl FromStr for ColourTransferCharacteristics {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        lookup(s, Self::PREFIX, &Self::ALL, Self::name)
            .ok_or_else(|| format!("unknown colour transfer characteristics `{s}`"))
    }
}

impl fmt::Display for ColourPrimaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for ColourTransferCharacteristics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ColourPrimaries {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

impl Serialize for ColourTransferCharacteristics {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}
