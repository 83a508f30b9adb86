//! Reader and writer for `.cube` 3D LUT text files.
//!
//! Rows are kept in file order, i.e. with the first (red) axis changing
//! fastest.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub const MIN_LUT_SIZE: usize = 2;
pub const MAX_LUT_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CubeFile {
    pub title: Option<String>,
    pub domain_min: Option<[f64; 3]>,
    pub domain_max: Option<[f64; 3]>,
    pub size: usize,
    pub entries: Vec<[f64; 3]>,
}

impl CubeFile {
    pub fn read<R: BufRead>(r: R) -> Result<Self> {
        let mut cube = CubeFile::default();
        let mut size = None;
        let mut domain_min = None;
        let mut domain_max = None;

        for (idx, line) in r.lines().enumerate() {
            let line = line?;
            let lineno = idx + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens[0].parse::<f64>().is_ok() {
                if tokens.len() != 3 {
                    return Err(Error::cube(lineno, "a table row needs exactly 3 values"));
                }
                cube.entries.push(parse_row(&tokens, lineno)?);
                continue;
            }
            if !cube.entries.is_empty() {
                return Err(Error::cube(lineno, "keywords must appear before the table"));
            }

            match tokens[0] {
                "TITLE" if cube.title.is_none() => {
                    let rest = line["TITLE".len()..].trim();
                    cube.title = Some(rest.trim_matches('"').to_string());
                }
                "DOMAIN_MIN" if domain_min.is_none() => {
                    domain_min = Some(parse_floats(&tokens[1..], lineno)?);
                }
                "DOMAIN_MAX" if domain_max.is_none() => {
                    domain_max = Some(parse_floats(&tokens[1..], lineno)?);
                }
                "LUT_1D_SIZE" => return Err(Error::cube(lineno, "1D LUTs are not supported")),
                "LUT_3D_SIZE" if size.is_none() => {
                    if tokens.len() != 2 {
                        return Err(Error::cube(lineno, "LUT_3D_SIZE takes exactly one value"));
                    }
                    let n: usize = tokens[1]
                        .parse()
                        .map_err(|_| Error::cube(lineno, format!("bad LUT_3D_SIZE `{}`", tokens[1])))?;
                    if !(MIN_LUT_SIZE..=MAX_LUT_SIZE).contains(&n) {
                        return Err(Error::InvalidLutSize(n));
                    }
                    size = Some(n);
                }
                other => {
                    return Err(Error::cube(lineno, format!("unknown or repeated keyword `{other}`")));
                }
            }
        }

        let size = size.ok_or_else(|| Error::InvalidCube("no LUT_3D_SIZE in the file".into()))?;
        cube.domain_min = domain_min.map(|v| domain(v, "DOMAIN_MIN")).transpose()?;
        cube.domain_max = domain_max.map(|v| domain(v, "DOMAIN_MAX")).transpose()?;
        let expected = size.pow(3);
        if cube.entries.len() != expected {
            return Err(Error::InvalidCube(format!(
                "expected {size}^3 = {expected} rows, found {}",
                cube.entries.len()
            )));
        }
        cube.size = size;
        Ok(cube)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let f = File::open(path)?;
        Self::read(BufReader::new(f))
    }

    pub fn write<W: Write>(&self, mut w: W) -> Result<()> {
        writeln!(w, "LUT_3D_SIZE {}", self.size)?;
        for [r, g, b] in &self.entries {
            writeln!(w, "{r:.7} {g:.7} {b:.7}")?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let f = File::create(path)?;
        self.write(BufWriter::new(f))
    }
}

fn parse_floats(tokens: &[&str], lineno: usize) -> Result<Vec<f64>> {
    tokens
        .iter()
        .map(|t| t.parse::<f64>().map_err(|_| Error::cube(lineno, format!("`{t}` is not a number"))))
        .collect()
}

fn parse_row(tokens: &[&str], lineno: usize) -> Result<[f64; 3]> {
    let v = parse_floats(tokens, lineno)?;
    Ok([v[0], v[1], v[2]])
}

fn domain(v: Vec<f64>, keyword: &str) -> Result<[f64; 3]> {
    <[f64; 3]>::try_from(v)
        .map_err(|v| Error::InvalidCube(format!("{keyword} needs 3 values, got {}", v.len())))
}
