//! Errors raised while rendering a migration.

/// A migration step that cannot be rendered.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// A step needs the table's primary key and there is none.
    #[error("table {table} has no primary key")]
    MissingPrimaryKey {
        /// Table name.
        table: String,
    },

    /// The column type has no textual form to emit.
    #[error("cannot render the type of column {table}.{column}")]
    UnrenderableType {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A step refers to an entity that is not in the database it applies to.
    #[error("{step} step refers to unknown {kind} {id}")]
    UnknownEntity {
        /// Step kind.
        step: &'static str,
        /// Entity kind.
        kind: &'static str,
        /// The offending ID.
        id: String,
    },
}
