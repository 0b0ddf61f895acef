//! Schema model.
//!
//! A [`Database`] is an immutable, ID-indexed snapshot of one schema: tables,
//! columns, enums, indexes, foreign keys and extensions live in flat arenas and
//! refer to each other by ID. [`Walker`]s provide read-only navigation.

mod database;
mod default;
mod enums;
mod foreign_key;
mod ids;
mod index;
mod pair;
mod table;
mod types;
mod walkers;

pub use database::{ArenaId, Database};
pub use default::DefaultValue;
pub use enums::{Enum, Extension};
pub use foreign_key::{ForeignKey, ForeignKeyAction, ForeignKeyColumn};
pub use ids::{
    ColumnId, EnumId, ExtensionId, ForeignKeyColumnId, ForeignKeyId, IndexColumnId, IndexId,
    TableId,
};
pub use index::{Index, IndexAlgorithm, IndexColumn, IndexKind, SortOrder};
pub use pair::Pair;
pub use table::{Column, Table};
pub use types::{ColumnArity, ColumnType, ColumnTypeFamily, NativeType, ScalarType};
pub use walkers::{
    ColumnWalker, EnumWalker, ExtensionWalker, ForeignKeyColumnWalker, ForeignKeyWalker,
    IndexColumnWalker, IndexWalker, TableWalker, Walker,
};
