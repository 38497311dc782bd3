#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{ArchiveError, ArchiveResult};

/// What a tool invocation should do with its single path argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Unpack,
    Pack,
}

impl Action {
    /// Pack when the extension matches `pack_ext` exactly, in lower or upper case.
    pub fn detect(path: &Path, pack_ext: &str) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext == pack_ext || ext == pack_ext.to_ascii_uppercase() => Action::Pack,
            _ => Action::Unpack,
        }
    }
}

/// Name given to the member written from physical slot `slot`.
pub fn member_file_name(slot: usize) -> String {
    format!("file_{slot:05}")
}

/// Archive file name without its last extension.
pub fn archive_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Regular files directly inside `dir`, sorted by bare file name.
pub fn list_data_files(dir: &Path) -> ArchiveResult<Vec<(String, PathBuf)>> {
    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for ent in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
        let ent = ent.map_err(|e| {
            let msg = e.to_string();
            let io = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, msg));
            ArchiveError::Io(io)
        })?;

        if !ent.file_type().is_file() {
            continue;
        }
        let name = ent.file_name().to_string_lossy().into_owned();
        files.push((name, ent.path().to_path_buf()));
    }

    files.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    Ok(files)
}
