#![forbid(unsafe_code)]

use crate::error::{ArchiveError, ArchiveResult};
use crate::io::{read_u24_le, u24_le_bytes};

/// WAD header magic ("PWF " with a trailing space).
pub const WAD_MAGIC: [u8; 4] = *b"PWF ";

/// Magic of the sub-header embedded at flagged packed-mode entries.
pub const EWDF_MAGIC: [u8; 4] = *b"EWDF";

/// WAD archives reserve a fixed block for the header and align every payload to it.
pub const WAD_BLOCK: u32 = 0x800;

/// Byte offset of the total-size field patched into the WAD header.
pub const WAD_SIZE_FIELD: u64 = 0x04;

/// Byte offset of the file-count field patched into the WAD header.
pub const WAD_COUNT_FIELD: u64 = 0x0C;

/// Packed-mode offsets are stored in units of this many bytes.
pub const PACKED_OFFSET_UNIT: u32 = 0x800;

/// Packed-mode sizes are stored in units of this many bytes.
pub const PACKED_SIZE_UNIT: u32 = 4;

/// Entry flag bit marking a packed-mode entry that carries an EWDF sub-header.
pub const PACKED_FLAG_EMBEDDED: u8 = 0x80;

/// On-disk width of one DOT1 offset-table slot.
pub const DOT1_SLOT: u32 = 4;

/// One member of a DOT1 archive, in physical (ascending offset) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetEntry {
    pub offset: u32,
    pub size: u32,
    /// Position of this offset in the on-disk table.
    pub original_index: usize,
}

/// One record of a flat-mode WAD table, also what the packer writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WadEntry {
    pub offset: u32,
    pub size: u32,
}

impl WadEntry {
    pub const LEN: usize = 8;

    pub fn decode(rec: &[u8]) -> Self {
        Self {
            offset: u32::from_le_bytes([rec[0], rec[1], rec[2], rec[3]]),
            size: u32::from_le_bytes([rec[4], rec[5], rec[6], rec[7]]),
        }
    }

    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut rec = [0u8; Self::LEN];
        rec[..4].copy_from_slice(&self.offset.to_le_bytes());
        rec[4..].copy_from_slice(&self.size.to_le_bytes());
        rec
    }
}

/// Fixed-size prefix of a WAD archive.
///
/// Layout:
/// - `[id 4]`          "PWF "
/// - `[4 bytes]`       archive size, patched by the packer, not read back
/// - `[u32 LE ver]`
/// - `[u32 LE files]`
///
/// The header proper is 16 bytes; the rest of the 0x800 block is carried
/// through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WadHeader {
    pub id: [u8; 4],
    pub version: u32,
    pub files: u32,
}

impl WadHeader {
    pub const LEN: usize = 16;

    pub fn parse(buf: &[u8; Self::LEN]) -> Self {
        Self {
            id: [buf[0], buf[1], buf[2], buf[3]],
            version: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            files: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        }
    }

    pub fn check_magic(&self) -> ArchiveResult<()> {
        if self.id != WAD_MAGIC {
            return Err(ArchiveError::BadMagic {
                expected: String::from_utf8_lossy(&WAD_MAGIC).into_owned(),
                found: String::from_utf8_lossy(&self.id).into_owned(),
            });
        }
        Ok(())
    }
}

/// Table layout of a WAD archive, chosen by probing the first table bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WadMode {
    /// Bit-packed 21-byte records, payloads behind EWDF sub-headers.
    Packed,
    /// Plain `{offset: u32, size: u32}` records.
    Flat,
}

impl WadMode {
    /// Flat mode when the top byte of both probe words is zero.
    pub fn detect(word0: u32, word1: u32) -> Self {
        if word0 >> 24 == 0 && word1 >> 24 == 0 {
            WadMode::Flat
        } else {
            WadMode::Packed
        }
    }

    /// Mode number as shown in progress output.
    pub fn number(self) -> u8 {
        match self {
            WadMode::Packed => 1,
            WadMode::Flat => 2,
        }
    }
}

/// One record of a packed-mode WAD table.
///
/// Record layout (21 bytes):
/// - `[u24 offset_field]`  stored offset in bits 8..24
/// - `[2]`                 reserved
/// - `[u24 size_field]`    stored size in bits 12..24
/// - `[12]`                reserved
/// - `[u8 flags]`
///
/// `offset = stored * 0x800`, `size = stored * 4`; the low bits of each
/// field are truncated on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedFileEntry {
    pub offset: u32,
    pub size: u32,
    pub flags: u8,
}

impl PackedFileEntry {
    pub const LEN: usize = 21;

    const OFFSET_SHIFT: u32 = 8;
    const SIZE_SHIFT: u32 = 12;

    pub fn decode(rec: &[u8; Self::LEN]) -> Self {
        let offset_field = read_u24_le(&rec[0..3]);
        let size_field = read_u24_le(&rec[5..8]);
        Self {
            offset: (offset_field >> Self::OFFSET_SHIFT) * PACKED_OFFSET_UNIT,
            size: (size_field >> Self::SIZE_SHIFT) * PACKED_SIZE_UNIT,
            flags: rec[20],
        }
    }

    /// Encode with zeroed reserved bits. Fails when offset or size is not
    /// an exact multiple of its unit or does not fit its field.
    pub fn encode(&self) -> ArchiveResult<[u8; Self::LEN]> {
        let offset_field = scale_into_field(self.offset, PACKED_OFFSET_UNIT, Self::OFFSET_SHIFT)
            .ok_or_else(|| {
                ArchiveError::Invalid(format!("offset {:#x} not representable", self.offset))
            })?;
        let size_field = scale_into_field(self.size, PACKED_SIZE_UNIT, Self::SIZE_SHIFT)
            .ok_or_else(|| {
                ArchiveError::Invalid(format!("size {:#x} not representable", self.size))
            })?;

        let mut rec = [0u8; Self::LEN];
        rec[0..3].copy_from_slice(&u24_le_bytes(offset_field));
        rec[5..8].copy_from_slice(&u24_le_bytes(size_field));
        rec[20] = self.flags;
        Ok(rec)
    }

    pub fn has_embedded_header(&self) -> bool {
        self.flags & PACKED_FLAG_EMBEDDED != 0
    }
}

fn scale_into_field(value: u32, unit: u32, shift: u32) -> Option<u32> {
    if value % unit != 0 {
        return None;
    }
    let stored = value / unit;
    if stored >= 1 << (24 - shift) {
        return None;
    }
    Some(stored << shift)
}

/// "EWDF" block living at the offset of a flagged packed-mode entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedSubHeader {
    pub xsize: u32,
    pub header_size: u32,
    pub crc: u32,
    pub name: String,
}

impl EmbeddedSubHeader {
    /// Absolute payload window `(start, len)` for an entry at `offset` spanning `size` bytes.
    pub fn payload_window(&self, offset: u32, size: u32) -> ArchiveResult<(u64, u32)> {
        let len = size.checked_sub(self.header_size).ok_or_else(|| {
            ArchiveError::Invalid(format!(
                "sub-header of {} claims {} header bytes but entry is {} bytes",
                self.name, self.header_size, size
            ))
        })?;
        Ok((u64::from(offset) + u64::from(self.header_size), len))
    }

    /// Output file name: CRC in 8 hex digits, then the embedded name.
    pub fn output_name(&self) -> String {
        let safe: String = self
            .name
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        format!("{:08x}_{}", self.crc, safe)
    }
}
