//! Migrator error types.

use std::time::Duration;

use schemata_core::migration::MigrationError;
use thiserror::Error;

/// Errors raised while introspecting or migrating a live database.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Connection or query failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema model or diff failure.
    #[error("schema error: {0}")]
    Core(#[from] schemata_core::Error),

    /// The plan could not be rendered.
    #[error("planning error: {0}")]
    Plan(#[from] MigrationError),

    /// A step failed while applying a plan.
    #[error("{comment}: {source}")]
    StepFailed {
        /// Description of the failing step.
        comment: String,
        /// The driver error.
        source: sqlx::Error,
    },

    /// Another migration holds the lock.
    #[error("migration lock for schema {schema:?} is held by another session")]
    LockHeld {
        /// Locked schema.
        schema: String,
    },

    /// The lock was not acquired within the configured timeout.
    #[error("timed out after {timeout:?} waiting for migration lock on schema {schema:?}")]
    LockTimeout {
        /// Locked schema.
        schema: String,
        /// How long we waited.
        timeout: Duration,
    },

    /// Introspected data the describer cannot interpret.
    #[error("introspection error: {0}")]
    Introspection(String),
}

/// Result alias for migrator operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
