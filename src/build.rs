#![forbid(unsafe_code)]

use log::{debug, warn};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, ArchiveResult};
use crate::format::{WadEntry, DOT1_SLOT, WAD_BLOCK, WAD_COUNT_FIELD, WAD_SIZE_FIELD};
use crate::index::SideIndex;
use crate::io::{pad_to_boundary, write_u32};
use crate::path::list_data_files;

fn to_u32(v: u64, what: &str) -> ArchiveResult<u32> {
    u32::try_from(v).map_err(|_| ArchiveError::Invalid(format!("{what} {v:#x} does not fit in 32 bits")))
}

/// Absolute offsets in original table order for members laid out back to
/// back, in the given (sorted file name) order, after the header and table.
///
/// Every member must have an entry in `index`, and the recorded indices must
/// cover `0..members.len()` exactly once.
pub fn dot1_offset_table(members: &[(String, u64)], index: &SideIndex) -> ArchiveResult<Vec<u32>> {
    // header slot + one per member + terminator
    let table_size = (members.len() as u64 + 2) * u64::from(DOT1_SLOT);

    let mut slots: Vec<Option<u32>> = vec![None; members.len()];
    let mut physical = 0u64;
    for (name, size) in members {
        let original = index
            .original_index(name)
            .ok_or_else(|| ArchiveError::MissingIndex(name.clone()))?;
        let slot = slots.get_mut(original).ok_or_else(|| {
            ArchiveError::Invalid(format!(
                "{name} has original index {original} but only {} members exist",
                members.len()
            ))
        })?;
        if slot.is_some() {
            return Err(ArchiveError::Invalid(format!(
                "{name} claims original index {original}, already taken"
            )));
        }
        *slot = Some(to_u32(physical + table_size, "member offset")?);
        debug!("{name}: slot {original}, offset {:#x}", physical + table_size);
        physical += size;
    }
    to_u32(physical + table_size, "archive size")?;

    // n members into n distinct in-range slots fills all of them
    Ok(slots.into_iter().flatten().collect())
}

/// Side-file entries with no matching member file, in side-file order.
fn unmatched_entries<'a>(index: &'a SideIndex, members: &[(String, u64)]) -> Vec<&'a (String, usize)> {
    index
        .entries
        .iter()
        .filter(|(name, _)| !members.iter().any(|(m, _)| m == name))
        .collect()
}

/// Rebuilds a DOT1 archive from the files in `data_dir`.
///
/// Output: `[header][offsets in original order][0][payloads in file name order]`.
pub fn pack_dot1(data_dir: &Path, index: &SideIndex, output: &Path) -> ArchiveResult<usize> {
    let files = list_data_files(data_dir)?;
    let mut members: Vec<(String, u64)> = Vec::with_capacity(files.len());
    for (name, path) in &files {
        members.push((name.clone(), std::fs::metadata(path)?.len()));
    }

    for (name, original) in unmatched_entries(index, &members) {
        warn!("{name} (slot {original:x}) is in the side file but not in {}", data_dir.display());
    }
    let table = dot1_offset_table(&members, index)?;

    let mut out = BufWriter::new(File::create(output)?);
    write_u32(&mut out, index.header)?;
    for offset in &table {
        write_u32(&mut out, *offset)?;
    }
    write_u32(&mut out, 0)?;

    for ((name, path), (_, size)) in files.iter().zip(&members) {
        let data = std::fs::read(path)?;
        if data.len() as u64 != *size {
            return Err(ArchiveError::Invalid(format!("{name} changed size while packing")));
        }
        out.write_all(&data)?;
    }

    out.flush()?;
    Ok(files.len())
}

/// Rebuilds a WAD archive from `header_block` and the files in `data_dir`.
///
/// Layout:
/// - `[header block 0x800]` copied verbatim, then patched
/// - `[u32 offset][u32 size]...` one pair per member, in file name order
/// - payloads, each starting on a 0x800 boundary
/// - zero padding up to the next 0x800 boundary
///
/// The total size is patched in at 0x04 and the member count at 0x0C.
/// Returns the member count and final archive size.
pub fn pack_wad(header_block: &[u8], data_dir: &Path, output: &Path) -> ArchiveResult<(usize, u64)> {
    let block = u64::from(WAD_BLOCK);
    if (header_block.len() as u64) < block {
        return Err(ArchiveError::Truncated(format!(
            "header block is {} bytes, need {block}",
            header_block.len()
        )));
    }

    let files: Vec<(String, PathBuf)> = list_data_files(data_dir)?;

    let mut out = BufWriter::new(File::create(output)?);
    out.write_all(&header_block[..WAD_BLOCK as usize])?;
    out.write_all(&vec![0u8; files.len() * WadEntry::LEN])?;

    let mut table: Vec<WadEntry> = Vec::with_capacity(files.len());
    for (name, path) in &files {
        let data = std::fs::read(path)?;
        let offset = pad_to_boundary(&mut out, block)?;
        out.write_all(&data)?;

        let entry = WadEntry {
            offset: to_u32(offset, "member offset")?,
            size: to_u32(data.len() as u64, "member size")?,
        };
        debug!("{name}: offset {:#x}, size {:#x}", entry.offset, entry.size);
        table.push(entry);
    }

    out.seek(SeekFrom::Start(block))?;
    for e in &table {
        out.write_all(&e.encode())?;
    }

    out.seek(SeekFrom::End(0))?;
    let total = to_u32(pad_to_boundary(&mut out, block)?, "archive size")?;

    out.seek(SeekFrom::Start(WAD_SIZE_FIELD))?;
    write_u32(&mut out, total)?;
    out.seek(SeekFrom::Start(WAD_COUNT_FIELD))?;
    write_u32(&mut out, to_u32(files.len() as u64, "member count")?)?;

    out.flush()?;
    Ok((files.len(), u64::from(total)))
}
