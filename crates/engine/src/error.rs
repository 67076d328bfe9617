use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TriageError>;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid input root: {0}")]
    InvalidPath(String),

    #[error("Failed to list dialog folders in {path}: {source}")]
    ListRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcript {path} is not valid JSON: {source}")]
    Transcript {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dispatcher task failed: {0}")]
    Dispatch(String),
}
