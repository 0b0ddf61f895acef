//! Foreign key definitions.

use serde::{Deserialize, Serialize};

use super::ids::{ColumnId, ForeignKeyId, TableId};

/// Referential action on delete or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    /// Raise an error at the end of the statement.
    #[default]
    NoAction,
    /// Raise an error immediately.
    Restrict,
    /// Propagate the change.
    Cascade,
    /// Set the referencing columns to NULL.
    SetNull,
    /// Set the referencing columns to their defaults.
    SetDefault,
}

impl ForeignKeyAction {
    /// The DDL keyword for this action.
    pub fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::Restrict => "RESTRICT",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
        }
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub constraint_name: String,
    /// Table holding the constrained columns.
    pub constrained_table: TableId,
    /// Table holding the referenced columns.
    pub referenced_table: TableId,
    /// Action on delete.
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
    /// Action on update.
    #[serde(default)]
    pub on_update: ForeignKeyAction,
}

impl ForeignKey {
    /// Create a foreign key with `NO ACTION` on both events.
    pub fn new(
        constraint_name: impl Into<String>,
        constrained_table: TableId,
        referenced_table: TableId,
    ) -> Self {
        Self {
            constraint_name: constraint_name.into(),
            constrained_table,
            referenced_table,
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }

    /// Set the delete action.
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Set the update action.
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }
}

/// One column mapping of a foreign key; ordinal position is storage order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyColumn {
    /// Owning foreign key.
    pub foreign_key: ForeignKeyId,
    /// Column on the constrained side.
    pub constrained_column: ColumnId,
    /// Column on the referenced side.
    pub referenced_column: ColumnId,
}
