//! Error types for hasync-fs

use std::path::PathBuf;

/// Result type for hasync-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hasync-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML at {path}: {message}")]
    YamlParse { path: PathBuf, message: String },

    #[error("Failed to serialize YAML for {path}: {message}")]
    YamlSerialize { path: PathBuf, message: String },

    #[error("Expected a mapping at the top level of {path}")]
    NotAMapping { path: PathBuf },

    #[error("Invalid filename {name:?}: {reason}")]
    InvalidFilename { name: String, reason: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    #[error("Refusing to overwrite existing {path}")]
    TargetExists { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_filename(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilename {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
