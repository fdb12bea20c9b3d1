use std::path::PathBuf;

use thiserror::Error;

/// Failures crossing the record-source boundary.
///
/// None of these abort a session: the store turns them into an empty
/// result for the key that failed and reports them once.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("source unavailable for {key}: {reason}")]
    Unavailable { key: String, reason: String },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("could not read source: {0}")]
    Parse(String),
}

impl From<anyhow::Error> for SourceError {
    fn from(e: anyhow::Error) -> Self {
        SourceError::Parse(format!("{e:#}"))
    }
}
