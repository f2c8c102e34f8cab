use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

/// Failures that stop a scan before its walk begins.
///
/// Subtree and file level problems never surface here; the walker logs
/// them and moves on.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan already in progress")]
    AlreadyRunning,

    #[error("cannot read {}: {source}", .path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("scan task failed: {details}")]
    Task { details: String },
}

impl ScanError {
    pub fn root_unreadable(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::RootUnreadable {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Short machine-friendly code used by the JSON transport.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "already_running",
            Self::RootUnreadable { .. } => "root_unreadable",
            Self::NotADirectory { .. } => "not_a_directory",
            Self::Task { .. } => "task_failed",
        }
    }
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Task {
            details: value.to_string(),
        }
    }
}
