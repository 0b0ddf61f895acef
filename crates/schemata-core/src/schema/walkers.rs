//! Read-only navigation over a [`Database`].
//!
//! A walker is an `(id, &Database)` pair. It is cheap to copy and only valid
//! for the database it was taken from.

use super::database::Database;
use super::default::DefaultValue;
use super::enums::{Enum, Extension};
use super::foreign_key::{ForeignKey, ForeignKeyAction, ForeignKeyColumn};
use super::ids::{
    ColumnId, EnumId, ExtensionId, ForeignKeyColumnId, ForeignKeyId, IndexColumnId, IndexId,
    TableId,
};
use super::index::{Index, IndexAlgorithm, IndexColumn, IndexKind, SortOrder};
use super::table::{Column, Table};
use super::types::{ColumnArity, ColumnType};

/// An entity ID together with the database that owns it.
#[derive(Debug, Clone, Copy)]
pub struct Walker<'a, I> {
    /// The walked entity.
    pub id: I,
    /// The owning database.
    pub db: &'a Database,
}

impl<'a, I> Walker<'a, I> {
    fn walk<J>(&self, id: J) -> Walker<'a, J> {
        Walker { id, db: self.db }
    }
}

/// Walker over a table.
pub type TableWalker<'a> = Walker<'a, TableId>;
/// Walker over a column.
pub type ColumnWalker<'a> = Walker<'a, ColumnId>;
/// Walker over an enum.
pub type EnumWalker<'a> = Walker<'a, EnumId>;
/// Walker over an index.
pub type IndexWalker<'a> = Walker<'a, IndexId>;
/// Walker over an index column.
pub type IndexColumnWalker<'a> = Walker<'a, IndexColumnId>;
/// Walker over a foreign key.
pub type ForeignKeyWalker<'a> = Walker<'a, ForeignKeyId>;
/// Walker over a foreign key column.
pub type ForeignKeyColumnWalker<'a> = Walker<'a, ForeignKeyColumnId>;
/// Walker over an extension.
pub type ExtensionWalker<'a> = Walker<'a, ExtensionId>;

impl<'a> TableWalker<'a> {
    /// The underlying table.
    pub fn get(self) -> &'a Table {
        &self.db.tables[self.id.index()]
    }

    /// Table name.
    pub fn name(self) -> &'a str {
        &self.get().name
    }

    /// Columns in storage order.
    pub fn columns(self) -> impl Iterator<Item = ColumnWalker<'a>> {
        let table = self.id;
        self.db
            .walk_columns()
            .filter(move |column| column.get().table == table)
    }

    /// Column by name.
    pub fn column(self, name: &str) -> Option<ColumnWalker<'a>> {
        self.columns().find(|column| column.name() == name)
    }

    /// All indexes of the table, the primary key included.
    pub fn indexes(self) -> impl Iterator<Item = IndexWalker<'a>> {
        let table = self.id;
        self.db
            .walk_indexes()
            .filter(move |index| index.get().table == table)
    }

    /// Indexes other than the primary key.
    pub fn secondary_indexes(self) -> impl Iterator<Item = IndexWalker<'a>> {
        self.indexes().filter(|index| !index.is_primary_key())
    }

    /// The first primary-key index, if any.
    pub fn primary_key(self) -> Option<IndexWalker<'a>> {
        self.indexes().find(|index| index.is_primary_key())
    }

    /// Foreign keys constraining this table.
    pub fn foreign_keys(self) -> impl Iterator<Item = ForeignKeyWalker<'a>> {
        let table = self.id;
        self.db
            .walk_foreign_keys()
            .filter(move |fk| fk.get().constrained_table == table)
    }

    /// Foreign keys of any table that reference this table.
    pub fn referencing_foreign_keys(self) -> impl Iterator<Item = ForeignKeyWalker<'a>> {
        let table = self.id;
        self.db
            .walk_foreign_keys()
            .filter(move |fk| fk.get().referenced_table == table)
    }
}

impl<'a> ColumnWalker<'a> {
    /// The underlying column.
    pub fn get(self) -> &'a Column {
        &self.db.columns[self.id.index()]
    }

    /// Column name.
    pub fn name(self) -> &'a str {
        &self.get().name
    }

    /// Owning table.
    pub fn table(self) -> TableWalker<'a> {
        self.walk(self.get().table)
    }

    /// Column type.
    pub fn column_type(self) -> &'a ColumnType {
        &self.get().column_type
    }

    /// Column arity.
    pub fn arity(self) -> ColumnArity {
        self.get().column_type.arity
    }

    /// Whether the column is NOT NULL.
    pub fn is_required(self) -> bool {
        self.arity() == ColumnArity::Required
    }

    /// Whether the column is an array.
    pub fn is_list(self) -> bool {
        self.arity() == ColumnArity::List
    }

    /// Default value.
    pub fn default(self) -> Option<&'a DefaultValue> {
        self.get().default.as_ref()
    }

    /// Whether values come from a sequence.
    pub fn is_auto_increment(self) -> bool {
        self.get().auto_increment
    }

    /// The enum this column is typed with.
    pub fn enum_type(self) -> Option<EnumWalker<'a>> {
        self.column_type().enum_id().map(|id| self.walk(id))
    }

    /// Whether the column is constrained by a foreign key.
    pub fn is_part_of_foreign_key(self) -> bool {
        let id = self.id;
        self.table().foreign_keys().any(|fk| {
            fk.columns()
                .any(|column| column.get().constrained_column == id)
        })
    }

    /// Whether the column is covered by the primary key.
    pub fn is_part_of_primary_key(self) -> bool {
        let id = self.id;
        self.table()
            .primary_key()
            .is_some_and(|pk| pk.columns().any(|column| column.get().column == id))
    }
}

impl<'a> EnumWalker<'a> {
    /// The underlying enum.
    pub fn get(self) -> &'a Enum {
        &self.db.enums[self.id.index()]
    }

    /// Type name.
    pub fn name(self) -> &'a str {
        &self.get().name
    }

    /// Variants in declaration order.
    pub fn values(self) -> &'a [String] {
        &self.get().values
    }

    /// Columns typed with this enum.
    pub fn columns(self) -> impl Iterator<Item = ColumnWalker<'a>> {
        let id = self.id;
        self.db
            .walk_columns()
            .filter(move |column| column.column_type().enum_id() == Some(id))
    }
}

impl<'a> IndexWalker<'a> {
    /// The underlying index.
    pub fn get(self) -> &'a Index {
        &self.db.indexes[self.id.index()]
    }

    /// Index name.
    pub fn name(self) -> &'a str {
        &self.get().name
    }

    /// Indexed table.
    pub fn table(self) -> TableWalker<'a> {
        self.walk(self.get().table)
    }

    /// Index kind.
    pub fn kind(self) -> IndexKind {
        self.get().kind
    }

    /// Access method.
    pub fn algorithm(self) -> IndexAlgorithm {
        self.get().algorithm
    }

    /// Whether the index is the primary key.
    pub fn is_primary_key(self) -> bool {
        self.kind() == IndexKind::PrimaryKey
    }

    /// Whether the index enforces uniqueness (primary keys included).
    pub fn is_unique(self) -> bool {
        matches!(self.kind(), IndexKind::Unique | IndexKind::PrimaryKey)
    }

    /// Index columns in key order.
    pub fn columns(self) -> impl Iterator<Item = IndexColumnWalker<'a>> {
        let id = self.id;
        (0..self.db.index_columns.len())
            .map(IndexColumnId::from_index)
            .filter(move |c| self.db.index_columns[c.index()].index == id)
            .map(move |c| self.walk(c))
    }

    /// Names of the indexed columns in key order.
    pub fn column_names(self) -> Vec<&'a str> {
        self.columns().map(|c| c.column().name()).collect()
    }
}

impl<'a> IndexColumnWalker<'a> {
    /// The underlying entry.
    pub fn get(self) -> &'a IndexColumn {
        &self.db.index_columns[self.id.index()]
    }

    /// The indexed column.
    pub fn column(self) -> ColumnWalker<'a> {
        self.walk(self.get().column)
    }

    /// Sort order.
    pub fn sort_order(self) -> SortOrder {
        self.get().sort_order
    }
}

impl<'a> ForeignKeyWalker<'a> {
    /// The underlying foreign key.
    pub fn get(self) -> &'a ForeignKey {
        &self.db.foreign_keys[self.id.index()]
    }

    /// Constraint name.
    pub fn constraint_name(self) -> &'a str {
        &self.get().constraint_name
    }

    /// Constrained table.
    pub fn table(self) -> TableWalker<'a> {
        self.walk(self.get().constrained_table)
    }

    /// Referenced table.
    pub fn referenced_table(self) -> TableWalker<'a> {
        self.walk(self.get().referenced_table)
    }

    /// Action on delete.
    pub fn on_delete(self) -> ForeignKeyAction {
        self.get().on_delete
    }

    /// Action on update.
    pub fn on_update(self) -> ForeignKeyAction {
        self.get().on_update
    }

    /// Column mappings in ordinal order.
    pub fn columns(self) -> impl Iterator<Item = ForeignKeyColumnWalker<'a>> {
        let id = self.id;
        (0..self.db.foreign_key_columns.len())
            .map(ForeignKeyColumnId::from_index)
            .filter(move |c| self.db.foreign_key_columns[c.index()].foreign_key == id)
            .map(move |c| self.walk(c))
    }

    /// Constrained columns in ordinal order.
    pub fn constrained_columns(self) -> impl Iterator<Item = ColumnWalker<'a>> {
        self.columns().map(|c| c.constrained_column())
    }

    /// Referenced columns in ordinal order.
    pub fn referenced_columns(self) -> impl Iterator<Item = ColumnWalker<'a>> {
        self.columns().map(|c| c.referenced_column())
    }

    /// Names of the constrained columns.
    pub fn constrained_column_names(self) -> Vec<&'a str> {
        self.constrained_columns().map(|c| c.name()).collect()
    }

    /// Names of the referenced columns.
    pub fn referenced_column_names(self) -> Vec<&'a str> {
        self.referenced_columns().map(|c| c.name()).collect()
    }

    /// Whether this is the auto-named key of an implicit many-to-many join
    /// table: exactly two columns named `A` and `B`.
    pub fn is_implicit_many_to_many_fk(self) -> bool {
        let table = self.table();
        let names: Vec<&str> = table.columns().map(|c| c.name()).collect();
        names.len() == 2 && names.contains(&"A") && names.contains(&"B")
    }
}

impl<'a> ForeignKeyColumnWalker<'a> {
    /// The underlying mapping.
    pub fn get(self) -> &'a ForeignKeyColumn {
        &self.db.foreign_key_columns[self.id.index()]
    }

    /// Column on the constrained side.
    pub fn constrained_column(self) -> ColumnWalker<'a> {
        self.walk(self.get().constrained_column)
    }

    /// Column on the referenced side.
    pub fn referenced_column(self) -> ColumnWalker<'a> {
        self.walk(self.get().referenced_column)
    }
}

impl<'a> ExtensionWalker<'a> {
    /// The underlying extension.
    pub fn get(self) -> &'a Extension {
        &self.db.extensions[self.id.index()]
    }

    /// Extension name.
    pub fn name(self) -> &'a str {
        &self.get().name
    }

    /// Pinned version.
    pub fn version(self) -> Option<&'a str> {
        self.get().version.as_deref()
    }

    /// Pinned schema.
    pub fn schema(self) -> Option<&'a str> {
        self.get().schema.as_deref()
    }
}
