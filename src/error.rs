//! Error types for mp4lut3d.

use crate::boxes::FourCC;
use std::io;
use std::path::PathBuf;

/// Result type for mp4lut3d operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Truncated header, bad extended-size framing or a box smaller than its header.
    #[error("malformed box: {0}")]
    MalformedBox(String),

    /// The file as a whole is unusable (missing moov, a box overrunning its parent).
    #[error("corrupt file: {0}")]
    CorruptFile(String),

    #[error("unknown production metadata type: {0}")]
    UnknownMetadataType(FourCC),

    #[error("insufficient data: need {need} bytes, have {have}")]
    InsufficientData { need: usize, have: usize },

    #[error("unsupported version and flags: {0:#010x}")]
    UnsupportedVersion(u32),

    #[error("invalid LUT size {0}, expected a value in [2, 256]")]
    InvalidLutSize(usize),

    #[error("invalid {kind} code: {code}")]
    InvalidColourCode { kind: &'static str, code: u8 },

    /// `.cube` syntax error, `line` is 1-based.
    #[error("cube line {line}: {msg}")]
    Cube { line: usize, msg: String },

    /// `.cube` file that parses but does not describe a usable 3D LUT.
    #[error("invalid cube file: {0}")]
    InvalidCube(String),

    #[error("unsupported file type: {}", .0.display())]
    UnsupportedFileType(PathBuf),

    #[error("input and output cannot be the same file: {}", .0.display())]
    SameInputOutputPath(PathBuf),

    #[error("no video track found")]
    NoVideoTrack,

    #[error("{tag} entry {offset} cannot be shifted by {delta}")]
    OffsetOverflow { tag: FourCC, offset: u64, delta: i64 },

    #[error("io: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedBox(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptFile(msg.into())
    }

    pub(crate) fn cube(line: usize, msg: impl Into<String>) -> Self {
        Self::Cube { line, msg: msg.into() }
    }
}
