//! Table and column definitions.

use serde::{Deserialize, Serialize};

use super::default::DefaultValue;
use super::ids::TableId;
use super::types::ColumnType;

/// A table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Table comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Table {
    /// Create a new table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: None,
        }
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Owning table.
    pub table: TableId,
    /// Column name.
    pub name: String,
    /// Column type including arity.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Whether values are generated from a sequence.
    #[serde(default)]
    pub auto_increment: bool,
}

impl Column {
    /// Create a new column.
    pub fn new(table: TableId, name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            table,
            name: name.into(),
            column_type,
            default: None,
            comment: None,
            auto_increment: false,
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Mark the column as auto-incrementing.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}
