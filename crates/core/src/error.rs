//! Error type shared by the extraction pipeline.

use std::path::PathBuf;

/// Errors surfaced by collection, identity and batch processing.
///
/// Malformed source nodes are not errors: they are skipped during extraction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No conversation text found. Open a chat conversation and scroll a bit, then try again.")]
    EmptyInput,

    #[error("Conversation not fully loaded yet. Scroll a bit and try again.")]
    InsufficientIdentity,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no snapshot files found under {0:?}")]
    NoSnapshots(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
