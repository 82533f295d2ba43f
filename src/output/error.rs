use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to open output file '{0}'")]
    Open(PathBuf, #[source] std::io::Error),

    #[error("I/O error writing output file '{0}'")]
    WriteIo(PathBuf, #[source] std::io::Error),

    #[error("Failed to serialize measurement row for '{0}'")]
    Serialize(PathBuf, #[source] serde_json::Error),

    #[error("Failed to assemble table for '{0}'")]
    FrameBuild(PathBuf, #[source] PolarsError),

    #[error("Encoding error writing table '{0}'")]
    TableWrite(PathBuf, #[source] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
