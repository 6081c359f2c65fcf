//! Error types for hasync-core

/// Result type for hasync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reconciling
///
/// `Schema` is a record that fails validation, `Fs` and `Remote` are store
/// failures, and `Consistency` is a post-condition that did not hold.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Record failed schema validation
    #[error(transparent)]
    Schema(#[from] hasync_meta::SchemaError),

    /// Local store failure
    #[error(transparent)]
    Fs(#[from] hasync_fs::Error),

    /// Remote store failure
    #[error("{operation} failed: {message}")]
    Remote { operation: String, message: String },

    /// Expected post-condition does not hold
    #[error("{key}: {message}")]
    Consistency { key: String, message: String },

    /// Desired entity id does not belong to the helper's platform
    #[error("entity id {entity_id} does not match platform {platform}")]
    EntityIdMismatch { entity_id: String, platform: String },

    /// Path does not map to any entity kind
    #[error("Unknown path: {path}")]
    UnknownPath { path: String },

    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn consistency(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Consistency {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
