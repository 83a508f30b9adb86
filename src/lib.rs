pub mod boxes;
pub mod colour;
pub mod cube;
pub mod error;
pub mod known_boxes;
pub mod lut3d;
pub mod mpeg4;
pub mod offsets;
pub mod parser;
pub mod production;
pub mod util;

pub use boxes::{Container, FourCC, HeaderKind, Mp4Box, Node, Payload};
pub use colour::{ColourPrimaries, ColourTransferCharacteristics};
pub use cube::CubeFile;
pub use error::{Error, Result};
pub use lut3d::Lut3d;
pub use mpeg4::Mpeg4Container;
pub use parser::{parse_children, read_box_header};
pub use production::{extract_lut3d, inject_lut3d, inject_lut3d_file, parse_lut3d_file};
