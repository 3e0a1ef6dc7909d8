//! Error types for SchemaMap

use thiserror::Error;

/// Result type for SchemaMap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for SchemaMap
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Schema reflection error: {0}")]
    ReflectionError(String),

    /// A primary key or foreign key spanning more than one column.
    /// Aborts the whole run.
    #[error("Unsupported composite key on table '{table}': {detail}")]
    UnsupportedCompositeKey { table: String, detail: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Error {
    pub(crate) fn composite_key(table: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::UnsupportedCompositeKey {
            table: table.into(),
            detail: detail.into(),
        }
    }
}

/// Convert Serde JSON errors to SchemaMap errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to SchemaMap errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
