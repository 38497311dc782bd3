#![forbid(unsafe_code)]

use log::{debug, warn};
use std::io::{Read, Seek, SeekFrom};

use crate::error::{ArchiveError, ArchiveResult};
use crate::format::{
    EmbeddedSubHeader, PackedFileEntry, WadEntry, WadHeader, WadMode, EWDF_MAGIC, WAD_BLOCK,
};
use crate::io::{read_at, read_cstring, read_exact, read_u32, try_read_u32};

/// DOT1 header word plus the offset table in on-disk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dot1Table {
    pub header: u32,
    /// `offsets[i]` is the offset stored in table slot `i`.
    pub offsets: Vec<u32>,
}

/// DOT1 layout:
/// - `[u32 header]`
/// - `[u32 offset]...` one per member, in original order
/// - `[u32 0]` terminator
/// - member payloads
///
/// A stream too short for the header yields an empty table. Reading stops at
/// the zero terminator or when fewer than four bytes remain.
pub fn read_dot1_table<R: Read + Seek>(r: &mut R) -> ArchiveResult<Dot1Table> {
    r.seek(SeekFrom::Start(0))?;
    let Some(header) = try_read_u32(r)? else {
        warn!("archive too short for a DOT1 header, treating as empty");
        return Ok(Dot1Table::default());
    };

    let mut offsets = Vec::new();
    while let Some(offset) = try_read_u32(r)? {
        if offset == 0 {
            break;
        }
        debug!("order {}, {:#x}", offsets.len(), offset);
        offsets.push(offset);
    }

    Ok(Dot1Table { header, offsets })
}

/// Reads the fixed 0x800-byte WAD header block and validates its magic.
pub fn read_wad_header<R: Read + Seek>(r: &mut R) -> ArchiveResult<(WadHeader, Vec<u8>)> {
    let block = read_at(r, 0, u64::from(WAD_BLOCK), "WAD header block")?;
    let mut head = [0u8; WadHeader::LEN];
    head.copy_from_slice(&block[..WadHeader::LEN]);

    let header = WadHeader::parse(&head);
    header.check_magic()?;
    Ok((header, block))
}

/// Probes the two words at 0x800 to pick the table layout.
pub fn probe_wad_mode<R: Read + Seek>(r: &mut R) -> ArchiveResult<WadMode> {
    r.seek(SeekFrom::Start(u64::from(WAD_BLOCK)))?;
    let (Some(word0), Some(word1)) = (try_read_u32(r)?, try_read_u32(r)?) else {
        debug!("no table words to probe, assuming flat layout");
        return Ok(WadMode::Flat);
    };
    Ok(WadMode::detect(word0, word1))
}

/// Byte length of a table of `files` records, checked against overflow.
fn table_len(files: u32, record: usize, what: &str) -> ArchiveResult<u64> {
    u64::from(files)
        .checked_mul(record as u64)
        .ok_or_else(|| ArchiveError::Truncated(format!("{what}: {files} records overflow the archive")))
}

pub fn read_packed_table<R: Read + Seek>(r: &mut R, files: u32) -> ArchiveResult<Vec<PackedFileEntry>> {
    let len = table_len(files, PackedFileEntry::LEN, "packed file table")?;
    let buf = read_at(r, u64::from(WAD_BLOCK), len, "packed file table")?;

    Ok(buf
        .chunks_exact(PackedFileEntry::LEN)
        .map(|rec| {
            let mut fixed = [0u8; PackedFileEntry::LEN];
            fixed.copy_from_slice(rec);
            PackedFileEntry::decode(&fixed)
        })
        .collect())
}

pub fn read_flat_table<R: Read + Seek>(r: &mut R, files: u32) -> ArchiveResult<Vec<WadEntry>> {
    let len = table_len(files, WadEntry::LEN, "file table")?;
    let buf = read_at(r, u64::from(WAD_BLOCK), len, "file table")?;
    Ok(buf.chunks_exact(WadEntry::LEN).map(WadEntry::decode).collect())
}

/// Reads the EWDF sub-header at `offset`. `None` when the magic is absent.
pub fn read_sub_header<R: Read + Seek>(r: &mut R, offset: u32) -> ArchiveResult<Option<EmbeddedSubHeader>> {
    r.seek(SeekFrom::Start(u64::from(offset)))?;
    let magic = match read_exact::<4>(r) {
        Ok(m) => m,
        Err(ArchiveError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    if magic != EWDF_MAGIC {
        return Ok(None);
    }

    let truncated = |e: ArchiveError| match e {
        ArchiveError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            ArchiveError::Truncated(format!("EWDF sub-header at {offset:#x}"))
        }
        other => other,
    };
    let xsize = read_u32(r).map_err(truncated)?;
    let header_size = read_u32(r).map_err(truncated)?;
    let crc = read_u32(r).map_err(truncated)?;
    let name = read_cstring(r)?;

    Ok(Some(EmbeddedSubHeader {
        xsize,
        header_size,
        crc,
        name,
    }))
}
