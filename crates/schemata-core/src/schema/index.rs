//! Index definitions.

use serde::{Deserialize, Serialize};

use super::ids::{ColumnId, IndexId, TableId};

/// What an index enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndexKind {
    /// A plain secondary index.
    #[default]
    Normal,
    /// A unique index.
    Unique,
    /// The table's primary key.
    PrimaryKey,
}

/// Index access method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndexAlgorithm {
    /// B-tree (the default access method).
    #[default]
    BTree,
    /// Hash.
    Hash,
    /// Generalized search tree.
    Gist,
    /// Generalized inverted index.
    Gin,
    /// Space-partitioned GiST.
    SpGist,
    /// Block range index.
    Brin,
}

impl IndexAlgorithm {
    /// Parse an access method name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "btree" => Some(IndexAlgorithm::BTree),
            "hash" => Some(IndexAlgorithm::Hash),
            "gist" => Some(IndexAlgorithm::Gist),
            "gin" => Some(IndexAlgorithm::Gin),
            "spgist" => Some(IndexAlgorithm::SpGist),
            "brin" => Some(IndexAlgorithm::Brin),
            _ => None,
        }
    }

    /// SQL name of the access method.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexAlgorithm::BTree => "BTREE",
            IndexAlgorithm::Hash => "HASH",
            IndexAlgorithm::Gist => "GIST",
            IndexAlgorithm::Gin => "GIN",
            IndexAlgorithm::SpGist => "SPGIST",
            IndexAlgorithm::Brin => "BRIN",
        }
    }
}

/// Sort order of an index column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Ascending,
    /// Descending.
    Descending,
}

/// An index on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Indexed table.
    pub table: TableId,
    /// Index (or constraint) name.
    pub name: String,
    /// Index kind.
    #[serde(default)]
    pub kind: IndexKind,
    /// Access method.
    #[serde(default)]
    pub algorithm: IndexAlgorithm,
}

impl Index {
    /// Create a normal index.
    pub fn new(table: TableId, name: impl Into<String>) -> Self {
        Self {
            table,
            name: name.into(),
            kind: IndexKind::Normal,
            algorithm: IndexAlgorithm::BTree,
        }
    }

    /// Create a unique index.
    pub fn unique(table: TableId, name: impl Into<String>) -> Self {
        Self {
            kind: IndexKind::Unique,
            ..Self::new(table, name)
        }
    }

    /// Create a primary key.
    pub fn primary_key(table: TableId, name: impl Into<String>) -> Self {
        Self {
            kind: IndexKind::PrimaryKey,
            ..Self::new(table, name)
        }
    }

    /// Set the access method.
    pub fn with_algorithm(mut self, algorithm: IndexAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/// One column entry of an index, in key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    /// Owning index.
    pub index: IndexId,
    /// Indexed column.
    pub column: ColumnId,
    /// Sort order.
    #[serde(default)]
    pub sort_order: SortOrder,
}
