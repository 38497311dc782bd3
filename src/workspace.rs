#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use crate::error::ArchiveResult;
use crate::path::archive_stem;

pub const DOT1_DATA_DIR: &str = "DOTdata";
pub const DOT1_SIDE_EXT: &str = "dhed";
pub const DOT1_OUTPUT: &str = "Dot1_new.dot";

pub const WAD_DATA_DIR: &str = "WADdata";
pub const WAD_SIDE_EXT: &str = "hed";
pub const WAD_HEADER_FILE: &str = "wadhead.hed";
pub const WAD_OUTPUT: &str = "WADnew.WAD";

/// Directory holding every artifact of an unpack/pack run: the member data
/// directories, the side files, and the rebuilt archives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn current() -> ArchiveResult<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dot1_data_dir(&self) -> PathBuf {
        self.root.join(DOT1_DATA_DIR)
    }

    /// `<archive stem>.dhed` next to the data directory.
    pub fn dot1_side_file(&self, archive: &Path) -> PathBuf {
        self.root
            .join(format!("{}.{DOT1_SIDE_EXT}", archive_stem(archive)))
    }

    pub fn dot1_output(&self) -> PathBuf {
        self.root.join(DOT1_OUTPUT)
    }

    pub fn wad_data_dir(&self) -> PathBuf {
        self.root.join(WAD_DATA_DIR)
    }

    pub fn wad_header_file(&self) -> PathBuf {
        self.root.join(WAD_HEADER_FILE)
    }

    pub fn wad_output(&self) -> PathBuf {
        self.root.join(WAD_OUTPUT)
    }
}
