use std::io::{self, Read, Seek, SeekFrom, Write};

pub fn read_slice<R: Read + Seek>(r: &mut R, offset: u64, len: u64) -> io::Result<Vec<u8>> {
    r.seek(SeekFrom::Start(offset))?;
    let mut v = vec![0u8; len as usize];
    r.read_exact(&mut v)?;
    Ok(v)
}

/// Stream `len` bytes at `offset` of `src` into `dst` through a bounded buffer.
pub fn copy_range<R: Read + Seek, W: Write + ?Sized>(
    src: &mut R,
    dst: &mut W,
    offset: u64,
    len: u64,
) -> io::Result<u64> {
    src.seek(SeekFrom::Start(offset))?;
    let copied = io::copy(&mut src.by_ref().take(len), dst)?;
    if copied != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("source ended after {copied} of {len} bytes at offset {offset}"),
        ));
    }
    Ok(copied)
}
