#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: String, found: String },

    #[error("truncated archive: {0}")]
    Truncated(String),

    #[error("no original index recorded for member file: {0}")]
    MissingIndex(String),

    #[error("malformed side file: {0}")]
    SideFile(String),

    #[error("invalid layout: {0}")]
    Invalid(String),
}

impl ArchiveError {
    /// Whether the binaries should report this with a failing exit code.
    pub fn is_bad_magic(&self) -> bool {
        matches!(self, ArchiveError::BadMagic { .. })
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
