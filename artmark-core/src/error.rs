//! Error types for artmark-core.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for the core crate.
///
/// All fallible public functions in this crate return [`Result<T>`](type@Result).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Reading or writing a file failed.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A record does not follow the annotation schema.
    #[error("schema error: {0}")]
    Schema(String),

    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Dataset curation input is unusable (bad ratios, empty inputs, ...).
    #[error("dataset error: {0}")]
    Dataset(String),

    /// A metric is undefined for the given inputs.
    #[error("metric undefined: {0}")]
    Metric(String),

    /// The external embedding model failed.
    #[error("embedding failed: {0}")]
    Embedding(Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap any error coming out of an embedding backend.
    pub fn embedding<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Embedding(err.into())
    }
}
