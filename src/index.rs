#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{ArchiveError, ArchiveResult};

const HEADER_PREFIX: &str = "Header: ";

/// Text index written next to an unpacked DOT1 archive:
///
/// ```text
/// Header: 301
/// file_00000 2
/// file_00001 0
/// file_00002 1
/// ```
///
/// Lines after the header follow physical (sorted offset) order and map each
/// member file to its original table slot, both in lowercase hex.
pub struct IndexWriter {
    out: BufWriter<File>,
}

impl IndexWriter {
    pub fn create(path: &Path, header: u32) -> ArchiveResult<Self> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "{HEADER_PREFIX}{header:x}")?;
        Ok(Self { out })
    }

    /// Entries are flushed as written so an aborted run leaves a usable prefix.
    pub fn push(&mut self, file_name: &str, original_index: usize) -> ArchiveResult<()> {
        writeln!(self.out, "{file_name} {original_index:x}")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn finish(mut self) -> ArchiveResult<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Parsed side file: the header word and `file name -> original index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideIndex {
    pub header: u32,
    /// Entries in the order they appear in the file.
    pub entries: Vec<(String, usize)>,
    by_name: HashMap<String, usize>,
}

impl SideIndex {
    pub fn load(path: &Path) -> ArchiveResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ArchiveError::SideFile(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> ArchiveResult<Self> {
        let mut lines = text.lines();

        let first = lines
            .next()
            .ok_or_else(|| ArchiveError::SideFile("empty side file".into()))?;
        let hex = first
            .strip_prefix(HEADER_PREFIX)
            .ok_or_else(|| ArchiveError::SideFile(format!("bad header line: {first:?}")))?;
        let header = u32::from_str_radix(hex.trim(), 16)
            .map_err(|_| ArchiveError::SideFile(format!("bad header value: {hex:?}")))?;

        let mut entries = Vec::new();
        let mut by_name = HashMap::new();
        for (n, line) in lines.enumerate() {
            let line_no = n + 2;
            let mut tokens = line.split_whitespace();
            let (name, index) = match (tokens.next(), tokens.next(), tokens.next()) {
                (None, _, _) => continue,
                (Some(name), Some(index), None) => (name, index),
                _ => {
                    return Err(ArchiveError::SideFile(format!(
                        "line {line_no}: expected `<file> <hex index>`, got {line:?}"
                    )))
                }
            };
            let index = usize::from_str_radix(index, 16).map_err(|_| {
                ArchiveError::SideFile(format!("line {line_no}: bad index {index:?}"))
            })?;
            if by_name.insert(name.to_string(), index).is_some() {
                return Err(ArchiveError::SideFile(format!(
                    "line {line_no}: duplicate entry for {name}"
                )));
            }
            entries.push((name.to_string(), index));
        }

        Ok(Self {
            header,
            entries,
            by_name,
        })
    }

    pub fn original_index(&self, file_name: &str) -> Option<usize> {
        self.by_name.get(file_name).copied()
    }
}
