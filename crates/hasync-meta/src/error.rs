//! Error types for hasync-meta

pub type Result<T> = std::result::Result<T, SchemaError>;

/// A record failed validation against its schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("{schema}.{field}: expected {expected}, found {found}")]
    TypeMismatch {
        schema: String,
        field: String,
        expected: String,
        found: String,
    },

    #[error("{schema}.{field}: {value:?} is not one of {allowed:?}")]
    InvalidChoice {
        schema: String,
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("{schema}: missing required field {field}")]
    MissingField { schema: String, field: String },
}
