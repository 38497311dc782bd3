#![forbid(unsafe_code)]

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use crate::error::{ArchiveError, ArchiveResult};

pub fn write_u32(w: &mut dyn Write, v: u32) -> ArchiveResult<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn read_exact<const N: usize>(r: &mut dyn Read) -> ArchiveResult<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_u32(r: &mut dyn Read) -> ArchiveResult<u32> {
    Ok(u32::from_le_bytes(read_exact::<4>(r)?))
}

/// Like [`read_u32`], but a stream ending before the word yields `None`.
pub fn try_read_u32(r: &mut dyn Read) -> ArchiveResult<Option<u32>> {
    let mut buf = [0u8; 4];
    match r.read_exact(&mut buf) {
        Ok(()) => Ok(Some(u32::from_le_bytes(buf))),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Reads `len` bytes at `offset`, reporting a short read as truncation of `what`.
///
/// The range is checked against the stream length before anything is
/// allocated, so lengths taken from a corrupt table fail cleanly.
pub fn read_at<R: Read + Seek>(r: &mut R, offset: u64, len: u64, what: &str) -> ArchiveResult<Vec<u8>> {
    let stream_len = r.seek(SeekFrom::End(0))?;
    if offset.checked_add(len).map_or(true, |end| end > stream_len) {
        return Err(ArchiveError::Truncated(format!(
            "{what}: {len} bytes at {offset:#x} run past end of archive ({stream_len:#x} bytes)"
        )));
    }

    r.seek(SeekFrom::Start(offset))?;
    let len = usize::try_from(len)
        .map_err(|_| ArchiveError::Invalid(format!("{what}: {len} bytes do not fit in memory")))?;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => ArchiveError::Truncated(format!(
            "{what}: {len} bytes at {offset:#x} run past end of archive"
        )),
        _ => ArchiveError::Io(e),
    })?;
    Ok(buf)
}

/// 24-bit little-endian value from the first three bytes of `b`.
pub fn read_u24_le(b: &[u8]) -> u32 {
    u32::from(b[0]) | (u32::from(b[1]) << 8) | (u32::from(b[2]) << 16)
}

pub fn u24_le_bytes(v: u32) -> [u8; 3] {
    let b = v.to_le_bytes();
    [b[0], b[1], b[2]]
}

/// Reads a NUL-terminated string; a stream ending first terminates it too.
pub fn read_cstring(r: &mut dyn Read) -> ArchiveResult<String> {
    let mut bytes = Vec::new();
    let mut ch = [0u8; 1];
    loop {
        match r.read(&mut ch)? {
            0 => break,
            _ if ch[0] == 0 => break,
            _ => bytes.push(ch[0]),
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Zero-fills from the current position up to the next multiple of `boundary`.
/// Returns the (aligned) position afterwards.
pub fn pad_to_boundary<W: Write + Seek>(w: &mut W, boundary: u64) -> ArchiveResult<u64> {
    let pos = w.stream_position()?;
    let rem = pos % boundary;
    if rem == 0 {
        return Ok(pos);
    }
    let pad = boundary - rem;
    w.write_all(&vec![0u8; pad as usize])?;
    Ok(pos + pad)
}
