use crate::boxes::FourCC;
use crate::colour::{ColourPrimaries, ColourTransferCharacteristics};
use crate::cube::{CubeFile, MAX_LUT_SIZE, MIN_LUT_SIZE};
use crate::error::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::fmt;
use std::io::{Cursor, Read};
use uuid::Uuid;

pub const FIXED_POINT_FRACTIONAL_BITS: u32 = 15;
/// Largest value representable before encoding; larger inputs are clamped.
pub const MAX_LUT_VALUE: f64 = 1.9999;
/// `production_metadata_type` of a 3D LUT payload.
pub const LUT3_TYPE: FourCC = FourCC(*b"lut3");

/// version+flags, connection UUID, metadata type
const PRMD_HEADER: usize = 4 + 16 + 4;
/// LUT size, colour primaries, transfer characteristics
const LUT3_HEADER: usize = 3;

pub fn to_fixed_point(x: f64) -> u16 {
    let mul = (1u32 << FIXED_POINT_FRACTIONAL_BITS) as f64;
    (x.clamp(0.0, MAX_LUT_VALUE) * mul + 0.5) as u16
}

pub fn from_fixed_point(code: u16) -> f64 {
    code as f64 / (1u32 << FIXED_POINT_FRACTIONAL_BITS) as f64
}

/// Map index `i` of an `n`x`n`x`n` table between last-axis-fastest and
/// first-axis-fastest order. Applying it twice gives `i` back.
pub fn shuffle_index(i: usize, n: usize) -> usize {
    let (a, b, c) = (i / n / n, (i / n) % n, i % n);
    (c * n + b) * n + a
}

/// Tone mapping metadata: a 3D LUT plus the colour space of its output.
///
/// `values` is indexed with the third component changing fastest, i.e.
/// `values[(r * n + g) * n + b]`, which is the order stored in `prmd`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3d {
    pub connection_uuid: Uuid,
    pub output_colour_primaries: ColourPrimaries,
    pub output_colour_transfer_characteristics: ColourTransferCharacteristics,
    size: usize,
    values: Vec<[f64; 3]>,
}

/// JSON-friendly view of a [`Lut3d`] without its table.
#[derive(Debug, Serialize)]
pub struct Lut3dSummary {
    pub connection_uuid: String,
    pub lut_size: usize,
    pub output_colour_primaries: ColourPrimaries,
    pub output_colour_transfer_characteristics: ColourTransferCharacteristics,
}

impl Lut3d {
    /// Empty LUT with a freshly generated connection UUID.
    pub fn new(
        primaries: ColourPrimaries,
        transfer: ColourTransferCharacteristics,
    ) -> Self {
        Self {
            connection_uuid: Uuid::new_v4(),
            output_colour_primaries: primaries,
            output_colour_transfer_characteristics: transfer,
            size: 0,
            values: Vec::new(),
        }
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.connection_uuid = uuid;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn values(&self) -> &[[f64; 3]] {
        &self.values
    }

    /// Replace the table. `values` must be in payload order.
    pub fn set_table(&mut self, size: usize, values: Vec<[f64; 3]>) -> Result<()> {
        if !(MIN_LUT_SIZE..=MAX_LUT_SIZE).contains(&size) {
            return Err(Error::InvalidLutSize(size));
        }
        let need = size.pow(3);
        if values.len() != need {
            return Err(Error::InsufficientData { need, have: values.len() });
        }
        self.size = size;
        self.values = values;
        Ok(())
    }

    /// Take the table of a parsed `.cube` file, converting its row order.
    pub fn load_cube(&mut self, cube: &CubeFile) -> Result<()> {
        let n = cube.size;
        if !(MIN_LUT_SIZE..=MAX_LUT_SIZE).contains(&n) {
            return Err(Error::InvalidLutSize(n));
        }
        let need = n.pow(3);
        if cube.entries.len() != need {
            return Err(Error::InsufficientData { need, have: cube.entries.len() });
        }
        let values = (0..need).map(|i| cube.entries[shuffle_index(i, n)]).collect();
        self.set_table(n, values)
    }

    pub fn to_cube(&self) -> CubeFile {
        let entries = (0..self.values.len())
            .map(|i| self.values[shuffle_index(i, self.size)])
            .collect();
        CubeFile { size: self.size, entries, ..CubeFile::default() }
    }

    /// Serialize as the payload of a `prmd` box.
    pub fn to_prmd_contents(&self) -> Result<Vec<u8>> {
        let size = u8::try_from(self.size)
            .ok()
            .filter(|&n| n as usize >= MIN_LUT_SIZE)
            .ok_or(Error::InvalidLutSize(self.size))?;

        let mut msg = Vec::with_capacity(PRMD_HEADER + LUT3_HEADER + self.values.len() * 6);
        msg.write_u32::<BigEndian>(0)?; // version and flags
        msg.extend_from_slice(self.connection_uuid.as_bytes());
        msg.extend_from_slice(&LUT3_TYPE.0);
        msg.write_u8(size)?;
        msg.write_u8(self.output_colour_primaries.code())?;
        msg.write_u8(self.output_colour_transfer_characteristics.code())?;
        for rgb in &self.values {
            for &x in rgb {
                msg.write_u16::<BigEndian>(to_fixed_point(x))?;
            }
        }
        Ok(msg)
    }

    /// Parse the payload of a `prmd` box.
    pub fn from_prmd_contents(src: &[u8]) -> Result<Self> {
        if src.len() < PRMD_HEADER {
            return Err(Error::InsufficientData { need: PRMD_HEADER, have: src.len() });
        }
        let mut msg = Cursor::new(src);
        let version_and_flags = msg.read_u32::<BigEndian>()?;
        if version_and_flags != 0 {
            return Err(Error::UnsupportedVersion(version_and_flags));
        }
        let mut uuid = [0u8; 16];
        msg.read_exact(&mut uuid)?;
        let mut typ = [0u8; 4];
        msg.read_exact(&mut typ)?;
        if FourCC(typ) != LUT3_TYPE {
            return Err(Error::UnknownMetadataType(FourCC(typ)));
        }

        let need = PRMD_HEADER + LUT3_HEADER;
        if src.len() < need {
            return Err(Error::InsufficientData { need, have: src.len() });
        }
        let size = msg.read_u8()? as usize;
        let primaries = ColourPrimaries::from_code(msg.read_u8()?)?;
        let transfer = ColourTransferCharacteristics::from_code(msg.read_u8()?)?;
        if size < MIN_LUT_SIZE {
            return Err(Error::InvalidLutSize(size));
        }

        let count = size.pow(3);
        let need = need + count * 3 * 2;
        if src.len() < need {
            return Err(Error::InsufficientData { need, have: src.len() });
        }
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let mut rgb = [0f64; 3];
            for c in &mut rgb {
                *c = from_fixed_point(msg.read_u16::<BigEndian>()?);
            }
            values.push(rgb);
        }

        Ok(Self {
            connection_uuid: Uuid::from_bytes(uuid),
            output_colour_primaries: primaries,
            output_colour_transfer_characteristics: transfer,
            size,
            values,
        })
    }

    pub fn summary(&self) -> Lut3dSummary {
        Lut3dSummary {
            connection_uuid: hex::encode(self.connection_uuid.as_bytes()),
            lut_size: self.size,
            output_colour_primaries: self.output_colour_primaries,
            output_colour_transfer_characteristics: self.output_colour_transfer_characteristics,
        }
    }
}

impl fmt::Display for Lut3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tone Map Metadata (3D LUT) {{")?;
        writeln!(f, "    metadata_connection_uuid (hex): {}", hex::encode(self.connection_uuid.as_bytes()))?;
        writeln!(f, "    lut_size: {}", self.size)?;
        writeln!(f, "    output_colour_primaries: {}", self.output_colour_primaries)?;
        writeln!(f, "    output_transfer_function: {}", self.output_colour_transfer_characteristics)?;
        write!(f, "}}")
    }
}
