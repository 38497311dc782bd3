#![forbid(unsafe_code)]

use blake3::Hasher;
use log::{debug, info};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::build::{pack_dot1 as pack_dot1_impl, pack_wad as pack_wad_impl};
use crate::error::{ArchiveError, ArchiveResult};
use crate::extract::{extract_dot1_members, extract_flat_members, extract_packed_members, Dot1Layout};
use crate::format::{WadMode, WAD_BLOCK};
use crate::index::{IndexWriter, SideIndex};
use crate::path::member_file_name;
use crate::read::{probe_wad_mode, read_dot1_table, read_flat_table, read_packed_table, read_wad_header};
use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackReport {
    /// Member files written.
    pub members: usize,
    /// Packed-mode WAD entries left out (unflagged or without sub-header).
    pub skipped: usize,
    pub data_dir: PathBuf,
    /// `.dhed` index for DOT1, raw header copy for WAD.
    pub side_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackReport {
    pub output: PathBuf,
    pub members: usize,
    pub size: u64,
    /// Blake3 of the rebuilt archive (hex), comparable against [`archive_digest`] of the original.
    pub digest: String,
}

/// Blake3 digest (hex) of a whole file.
pub fn archive_digest(path: &Path) -> ArchiveResult<String> {
    let mut hasher = Hasher::new();
    hasher.update_reader(File::open(path)?)?;
    Ok(hasher.finalize().to_hex().to_string())
}

fn open_archive(archive: &Path) -> ArchiveResult<File> {
    info!("{}", archive.display());
    File::open(archive).map_err(|e| {
        ArchiveError::Io(std::io::Error::new(
            e.kind(),
            format!("could not open {}: {e}", archive.display()),
        ))
    })
}

fn finish_pack(output: PathBuf, members: usize) -> ArchiveResult<PackReport> {
    let size = std::fs::metadata(&output)?.len();
    let digest = archive_digest(&output)?;
    info!("{} created successfully ({members} members, {size} bytes, blake3 {digest})", output.display());
    Ok(PackReport {
        output,
        members,
        size,
        digest,
    })
}

/// Splits a DOT1 archive into `DOTdata/file_NNNNN` plus a `<stem>.dhed` index.
pub fn unpack_dot1(archive: &Path, ws: &Workspace) -> ArchiveResult<UnpackReport> {
    let mut f = open_archive(archive)?;
    info!("opened DOT1 archive");

    let data_dir = ws.dot1_data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let table = read_dot1_table(&mut f)?;
    let file_size = f.seek(SeekFrom::End(0))?;
    let layout = Dot1Layout::plan(&table.offsets, file_size)?;
    for (original, slot) in layout.slot_of_original.iter().enumerate() {
        debug!("table slot {original} -> {}", member_file_name(*slot));
    }

    let side_file = ws.dot1_side_file(archive);
    let mut index = IndexWriter::create(&side_file, table.header)?;
    let members = extract_dot1_members(&mut f, &layout, &data_dir, &mut index)?;
    index.finish()?;

    info!("extracted {members} members, index written to {}", side_file.display());
    Ok(UnpackReport {
        members,
        skipped: 0,
        data_dir,
        side_file,
    })
}

/// Rebuilds `Dot1_new.dot` from `DOTdata/` and the given `.dhed` index.
pub fn pack_dot1(side_file: &Path, ws: &Workspace) -> ArchiveResult<PackReport> {
    let index = SideIndex::load(side_file)?;
    let output = ws.dot1_output();
    let members = pack_dot1_impl(&ws.dot1_data_dir(), &index, &output)?;
    finish_pack(output, members)
}

/// Splits a WAD archive into `WADdata/` and copies its header block to `wadhead.hed`.
pub fn unpack_wad(archive: &Path, ws: &Workspace) -> ArchiveResult<UnpackReport> {
    let mut f = open_archive(archive)?;
    info!("opened WAD archive");

    let (header, block) = read_wad_header(&mut f)?;

    let side_file = ws.wad_header_file();
    std::fs::write(&side_file, &block)?;

    let data_dir = ws.wad_data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let mode = probe_wad_mode(&mut f)?;
    info!(
        "header ok, version {:#x}, {} files, mode {} ({mode:?})",
        header.version,
        header.files,
        mode.number()
    );

    let (members, skipped) = match mode {
        WadMode::Packed => {
            let entries = read_packed_table(&mut f, header.files)?;
            extract_packed_members(&mut f, &entries, &data_dir)?
        }
        WadMode::Flat => {
            let entries = read_flat_table(&mut f, header.files)?;
            (extract_flat_members(&mut f, &entries, &data_dir)?, 0)
        }
    };

    info!("extracted {members} members, skipped {skipped}");
    Ok(UnpackReport {
        members,
        skipped,
        data_dir,
        side_file,
    })
}

/// Rebuilds `WADnew.WAD` from `WADdata/` and the given header block file.
pub fn pack_wad(header_file: &Path, ws: &Workspace) -> ArchiveResult<PackReport> {
    let mut block = Vec::with_capacity(WAD_BLOCK as usize);
    File::open(header_file)
        .map_err(|e| {
            ArchiveError::Io(std::io::Error::new(
                e.kind(),
                format!("cannot open header file {}: {e}", header_file.display()),
            ))
        })?
        .take(u64::from(WAD_BLOCK))
        .read_to_end(&mut block)?;

    let output = ws.wad_output();
    let (members, _) = pack_wad_impl(&block, &ws.wad_data_dir(), &output)?;
    finish_pack(output, members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn dot1_archive(header: u32, offsets: &[u32], payload: &[u8]) -> Vec<u8> {
        let mut bytes = header.to_le_bytes().to_vec();
        for o in offsets {
            bytes.extend_from_slice(&o.to_le_bytes());
        }
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn empty_dot1_table_yields_no_members() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        let archive = dir.path().join("EMPTY.DOT");
        fs::write(&archive, dot1_archive(0x0301, &[], b"junk")).unwrap();

        let report = unpack_dot1(&archive, &ws).unwrap();
        assert_eq!(report.members, 0);
        assert_eq!(fs::read_dir(ws.dot1_data_dir()).unwrap().count(), 0);
        assert_eq!(fs::read_to_string(&report.side_file).unwrap(), "Header: 301\n");
    }

    #[test]
    fn dot1_side_file_records_original_indices() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        let archive = dir.path().join("CHR01.DOT");
        // table: 3 offsets + header + terminator = 20 bytes
        fs::write(&archive, dot1_archive(0x0301, &[0x18, 0x14, 0x16], b"aabbcccc")).unwrap();

        let report = unpack_dot1(&archive, &ws).unwrap();
        assert_eq!(report.side_file, dir.path().join("CHR01.dhed"));
        assert_eq!(
            fs::read_to_string(&report.side_file).unwrap(),
            "Header: 301\nfile_00000 1\nfile_00001 2\nfile_00002 0\n"
        );
        assert_eq!(fs::read(ws.dot1_data_dir().join("file_00002")).unwrap(), b"cccc");
    }

    #[test]
    fn truncated_dot1_keeps_readable_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        let archive = dir.path().join("CUT.DOT");
        // 0x14-byte table, 12 payload bytes, last offset far past the end
        let bytes = dot1_archive(0x0301, &[0x14, 0x18, 0x100], b"ddddeeeeffff");
        assert_eq!(bytes.len(), 0x20);
        fs::write(&archive, bytes).unwrap();

        let err = unpack_dot1(&archive, &ws).unwrap_err();
        assert!(matches!(err, ArchiveError::Truncated(_)));
        assert_eq!(fs::read(ws.dot1_data_dir().join("file_00000")).unwrap(), b"dddd");
        assert!(!ws.dot1_data_dir().join("file_00001").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("CUT.dhed")).unwrap(),
            "Header: 301\nfile_00000 0\n"
        );
    }

    #[test]
    fn corrupt_wad_file_count_is_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        let archive = dir.path().join("BIG.WAD");
        let mut bytes = vec![0u8; 0x810];
        bytes[..4].copy_from_slice(b"PWF ");
        bytes[12..16].copy_from_slice(&u32::MAX.to_le_bytes());
        // nonzero top byte in the second word selects the packed table
        bytes[0x807] = 0x06;
        fs::write(&archive, bytes).unwrap();

        let err = unpack_wad(&archive, &ws).unwrap_err();
        assert!(matches!(err, ArchiveError::Truncated(_)));
        assert_eq!(fs::read_dir(ws.wad_data_dir()).unwrap().count(), 0);
    }

    #[test]
    fn bad_wad_magic_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        let archive = dir.path().join("WAD.WAD");
        let mut bytes = b"RIFF".to_vec();
        bytes.resize(0x800, 0);
        fs::write(&archive, bytes).unwrap();

        let err = unpack_wad(&archive, &ws).unwrap_err();
        assert!(err.is_bad_magic());
        assert!(!ws.wad_header_file().exists());
    }

    #[test]
    fn missing_archive_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        let err = unpack_dot1(&dir.path().join("nope.dot"), &ws).unwrap_err();
        assert!(matches!(err, ArchiveError::Io(_)));
    }

    #[test]
    fn digest_matches_blake3_of_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.bin");
        fs::write(&path, b"mutant academy").unwrap();
        assert_eq!(
            archive_digest(&path).unwrap(),
            blake3::hash(b"mutant academy").to_hex().to_string()
        );

        let big: Vec<u8> = (0..200_000u32).map(|i| (i % 253) as u8).collect();
        fs::write(&path, &big).unwrap();
        assert_eq!(archive_digest(&path).unwrap(), blake3::hash(&big).to_hex().to_string());
    }
}
