//! Core error types.

use thiserror::Error;

use crate::migration::MigrationError;

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A native type was given arguments it cannot take.
    #[error("invalid argument for type {type_name}: {message}")]
    InvalidArgument {
        /// The type being parsed.
        type_name: String,
        /// What was wrong with the arguments.
        message: String,
    },

    /// A database value violates the schema model's invariants.
    #[error("invalid schema {schema:?}: {message}")]
    InvalidSchema {
        /// Name of the offending database.
        schema: String,
        /// Description of the violation.
        message: String,
    },

    /// Planning failed.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Snapshot (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_argument(type_name: &str, message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            type_name: type_name.to_string(),
            message: message.into(),
        }
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
