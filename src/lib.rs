#![forbid(unsafe_code)]

//! Extractor/packer for the DOT1 and WAD (PWF) containers of X-Men Mutant Academy.

mod build;
mod error;
mod extract;
mod format;
mod index;
mod io;
mod ops;
mod path;
mod read;
mod workspace;

pub use build::dot1_offset_table;
pub use error::{ArchiveError, ArchiveResult};
pub use extract::Dot1Layout;
pub use format::{
    EmbeddedSubHeader, OffsetEntry, PackedFileEntry, WadEntry, WadHeader, WadMode, EWDF_MAGIC,
    WAD_BLOCK, WAD_MAGIC,
};
pub use index::SideIndex;
pub use path::Action;
pub use read::{read_dot1_table, Dot1Table};
pub use workspace::{Workspace, DOT1_SIDE_EXT, WAD_SIDE_EXT};

pub use ops::{archive_digest, pack_dot1, pack_wad, unpack_dot1, unpack_wad, PackReport, UnpackReport};
