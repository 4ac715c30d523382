use std::{fmt, path::PathBuf};
use thiserror::Error;

/// Conditions that stop the manager until the user points it at valid paths.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Noita game directory not found (expected noita.exe in {0})")]
    GameRootMissing(PathBuf),

    #[error("Workshop directory not found: {0}")]
    WorkshopRootMissing(PathBuf),
}

/// Why one scanned directory entry was left out of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("directory name is not a numeric item id")]
    NotNumeric,

    #[error("not a directory")]
    NotDirectory,

    #[error("no mod_id.txt")]
    MissingNameFile,

    #[error("mod_id.txt is empty")]
    EmptyNameFile,

    #[error("duplicate folder name")]
    Duplicate,

    #[error("unreadable: {0}")]
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: SkipReason,
}

impl SkippedEntry {
    pub fn new(path: impl Into<PathBuf>, reason: SkipReason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }
}

impl fmt::Display for SkippedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}
