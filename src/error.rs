use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while loading exports into the database
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("table {0:?} is not in the configured table order")]
    UnknownTable(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LoadError>;
