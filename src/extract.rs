#![forbid(unsafe_code)]

use log::{debug, warn};
use std::io::{Read, Seek};
use std::path::Path;

use crate::error::{ArchiveError, ArchiveResult};
use crate::format::{OffsetEntry, PackedFileEntry, WadEntry};
use crate::index::IndexWriter;
use crate::io::read_at;
use crate::path::member_file_name;
use crate::read::read_sub_header;

/// DOT1 members in physical order together with the mapping back to the
/// on-disk table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dot1Layout {
    /// Members sorted by offset. Each size runs up to the next offset, the
    /// last one up to the end of the archive.
    pub physical: Vec<OffsetEntry>,
    /// `slot_of_original[i]` is the physical slot of table entry `i`.
    pub slot_of_original: Vec<usize>,
}

impl Dot1Layout {
    /// Equal offsets keep their table order, so each original index is used
    /// exactly once and zero-sized members stay distinct.
    pub fn plan(offsets: &[u32], file_size: u64) -> ArchiveResult<Self> {
        let file_size = u32::try_from(file_size)
            .map_err(|_| ArchiveError::Invalid(format!("archive of {file_size} bytes exceeds u32 offsets")))?;

        let mut order: Vec<(u32, usize)> = offsets.iter().copied().zip(0..).collect();
        order.sort_by_key(|&(offset, _)| offset);

        // Sizes are not clamped to the archive. The first member running past
        // the end fails its read after the members before it are written.
        let physical: Vec<OffsetEntry> = order
            .iter()
            .enumerate()
            .map(|(slot, &(offset, original_index))| {
                let end = order.get(slot + 1).map_or(file_size, |next| next.0);
                OffsetEntry {
                    offset,
                    size: end.saturating_sub(offset),
                    original_index,
                }
            })
            .collect();

        let mut slot_of_original = vec![0; physical.len()];
        for (slot, e) in physical.iter().enumerate() {
            slot_of_original[e.original_index] = slot;
        }

        Ok(Self {
            physical,
            slot_of_original,
        })
    }
}

fn write_member(data_dir: &Path, name: &str, bytes: &[u8]) -> ArchiveResult<()> {
    debug!("writing {name} ({} bytes)", bytes.len());
    std::fs::write(data_dir.join(name), bytes)?;
    Ok(())
}

/// Writes every member as `file_NNNNN` (NNNNN = physical slot) and records its
/// original index in the side file. Stops at the first failed read; members
/// already written stay on disk.
pub fn extract_dot1_members<R: Read + Seek>(
    r: &mut R,
    layout: &Dot1Layout,
    data_dir: &Path,
    index: &mut IndexWriter,
) -> ArchiveResult<usize> {
    for (slot, e) in layout.physical.iter().enumerate() {
        let name = member_file_name(slot);
        let data = read_at(r, u64::from(e.offset), u64::from(e.size), &name)?;
        write_member(data_dir, &name, &data)?;
        index.push(&name, e.original_index)?;
    }
    Ok(layout.physical.len())
}

/// Flat-mode WAD: each table record names a payload directly.
pub fn extract_flat_members<R: Read + Seek>(
    r: &mut R,
    entries: &[WadEntry],
    data_dir: &Path,
) -> ArchiveResult<usize> {
    for (i, e) in entries.iter().enumerate() {
        let name = member_file_name(i);
        let data = read_at(r, u64::from(e.offset), u64::from(e.size), &name)?;
        write_member(data_dir, &name, &data)?;
    }
    Ok(entries.len())
}

/// Packed-mode WAD: only flagged entries with an EWDF sub-header are
/// extracted, as `<crc>_<name>`. Returns `(extracted, skipped)`.
pub fn extract_packed_members<R: Read + Seek>(
    r: &mut R,
    entries: &[PackedFileEntry],
    data_dir: &Path,
) -> ArchiveResult<(usize, usize)> {
    let mut extracted = 0;
    for (i, e) in entries.iter().enumerate() {
        if !e.has_embedded_header() {
            debug!("entry {i}: flags {:#04x}, skipped", e.flags);
            continue;
        }
        let Some(sub) = read_sub_header(r, e.offset)? else {
            warn!("entry {i}: no EWDF sub-header at {:#x}, skipped", e.offset);
            continue;
        };

        let (start, len) = sub.payload_window(e.offset, e.size)?;
        let name = sub.output_name();
        let data = read_at(r, start, u64::from(len), &name)?;
        write_member(data_dir, &name, &data)?;
        extracted += 1;
    }
    Ok((extracted, entries.len() - extracted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::EWDF_MAGIC;
    use crate::index::SideIndex;
    use std::fs;
    use std::io::Cursor;

    #[test]
    fn plan_derives_sizes_in_sorted_order() {
        let layout = Dot1Layout::plan(&[0, 10, 10, 30], 40).unwrap();
        let offsets: Vec<u32> = layout.physical.iter().map(|e| e.offset).collect();
        let sizes: Vec<u32> = layout.physical.iter().map(|e| e.size).collect();
        assert_eq!(offsets, [0, 10, 10, 30]);
        assert_eq!(sizes, [10, 0, 20, 10]);

        let originals: Vec<usize> = layout.physical.iter().map(|e| e.original_index).collect();
        assert_eq!(originals, [0, 1, 2, 3]);
    }

    #[test]
    fn plan_maps_both_directions() {
        let layout = Dot1Layout::plan(&[0x30, 0x10, 0x20], 0x38).unwrap();
        let originals: Vec<usize> = layout.physical.iter().map(|e| e.original_index).collect();
        assert_eq!(originals, [1, 2, 0]);
        assert_eq!(layout.slot_of_original, [2, 0, 1]);
        assert_eq!(layout.physical[2].size, 8);
    }

    #[test]
    fn plan_handles_empty_and_single_tables() {
        let empty = Dot1Layout::plan(&[], 4).unwrap();
        assert!(empty.physical.is_empty());

        let single = Dot1Layout::plan(&[12], 20).unwrap();
        assert_eq!(single.physical[0].size, 8);
    }

    #[test]
    fn plan_accepts_offsets_past_end() {
        let layout = Dot1Layout::plan(&[12, 64], 40).unwrap();
        let sizes: Vec<u32> = layout.physical.iter().map(|e| e.size).collect();
        assert_eq!(sizes, [52, 0]);
    }

    #[test]
    fn zero_sized_member_extracts_as_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let side = dir.path().join("t.dhed");
        let mut archive = vec![0u8; 40];
        archive[10..30].fill(0xAB);

        let layout = Dot1Layout::plan(&[0, 10, 10, 30], 40).unwrap();
        let mut index = IndexWriter::create(&side, 1).unwrap();
        let n = extract_dot1_members(&mut Cursor::new(archive), &layout, dir.path(), &mut index).unwrap();
        index.finish().unwrap();

        assert_eq!(n, 4);
        assert_eq!(fs::read(dir.path().join("file_00001")).unwrap(), b"");
        assert_eq!(fs::read(dir.path().join("file_00002")).unwrap(), vec![0xAB; 20]);
        let idx = SideIndex::load(&side).unwrap();
        assert_eq!(idx.original_index("file_00002"), Some(2));
    }

    #[test]
    fn member_running_past_end_is_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let side = dir.path().join("t.dhed");
        let layout = Dot1Layout::plan(&[8, 20, 64], 20).unwrap();
        let mut index = IndexWriter::create(&side, 1).unwrap();

        let err = extract_dot1_members(&mut Cursor::new(vec![7u8; 20]), &layout, dir.path(), &mut index)
            .unwrap_err();
        index.finish().unwrap();
        assert!(matches!(err, ArchiveError::Truncated(_)));
        assert_eq!(fs::read(dir.path().join("file_00000")).unwrap(), vec![7u8; 12]);
        assert!(!dir.path().join("file_00001").exists());
        let idx = SideIndex::load(&side).unwrap();
        assert_eq!(idx.entries, [("file_00000".to_string(), 0)]);
    }

    fn packed_archive_with_sub_header(header_size: u32) -> (Vec<u8>, PackedFileEntry) {
        let entry = PackedFileEntry {
            offset: 0x2000,
            size: 400,
            flags: 0x80,
        };
        let mut bytes = vec![0u8; 0x2000];
        bytes.extend_from_slice(&EWDF_MAGIC);
        bytes.extend_from_slice(&400u32.to_le_bytes());
        bytes.extend_from_slice(&header_size.to_le_bytes());
        bytes.extend_from_slice(&0x1234_abcdu32.to_le_bytes());
        let payload_start = 0x2000 + header_size as usize;
        bytes.resize(payload_start, 0);
        bytes.extend((0..384u32).map(|i| i as u8));
        (bytes, entry)
    }

    #[test]
    fn packed_entry_payload_starts_after_sub_header() {
        let dir = tempfile::tempdir().unwrap();
        let (bytes, entry) = packed_archive_with_sub_header(16);

        let (extracted, skipped) =
            extract_packed_members(&mut Cursor::new(bytes), &[entry], dir.path()).unwrap();
        assert_eq!((extracted, skipped), (1, 0));

        let out = fs::read(dir.path().join("1234abcd_")).unwrap();
        assert_eq!(out.len(), 384);
        assert_eq!(out[0], 0);
        assert_eq!(out[383], 383u32 as u8);
    }

    #[test]
    fn packed_entries_without_flag_or_magic_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (bytes, flagged) = packed_archive_with_sub_header(16);
        let unflagged = PackedFileEntry { flags: 0x01, ..flagged };
        let no_magic = PackedFileEntry {
            offset: 0x800,
            ..flagged
        };

        let (extracted, skipped) =
            extract_packed_members(&mut Cursor::new(bytes), &[unflagged, no_magic], dir.path()).unwrap();
        assert_eq!((extracted, skipped), (0, 2));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn flat_entries_extract_in_table_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = vec![0u8; 0x20];
        bytes[0x10..0x14].copy_from_slice(b"abcd");
        bytes[0x18..0x1a].copy_from_slice(b"xy");
        let entries = [
            WadEntry { offset: 0x18, size: 2 },
            WadEntry { offset: 0x10, size: 4 },
        ];

        let n = extract_flat_members(&mut Cursor::new(bytes), &entries, dir.path()).unwrap();
        assert_eq!(n, 2);
        assert_eq!(fs::read(dir.path().join("file_00000")).unwrap(), b"xy");
        assert_eq!(fs::read(dir.path().join("file_00001")).unwrap(), b"abcd");
    }
}
