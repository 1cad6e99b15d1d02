use std::path::PathBuf;

use thiserror::Error;

use crate::types::ImageId;

/// Errors raised while splitting, indexing or querying a dataset.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: invalid JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed annotation document: {0}")]
    MalformedDocument(String),

    #[error("malformed annotation document: image id {0} appears more than once")]
    DuplicateImage(ImageId),

    #[error("index file: {0}")]
    Csv(#[from] csv::Error),

    #[error("{}: failed to write index: {source}", .path.display())]
    IndexWrite {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("index file header: {0}")]
    MalformedIndexHeader(String),

    #[error("index file row {row}: {reason}")]
    MalformedIndex { row: usize, reason: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
