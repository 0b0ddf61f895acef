//! The root schema value.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::enums::{Enum, Extension};
use super::foreign_key::{ForeignKey, ForeignKeyColumn};
use super::ids::{
    ColumnId, EnumId, ExtensionId, ForeignKeyColumnId, ForeignKeyId, IndexColumnId, IndexId,
    TableId,
};
use super::index::{Index, IndexColumn, IndexKind, SortOrder};
use super::table::{Column, Table};
use super::walkers::{
    ColumnWalker, EnumWalker, ExtensionWalker, ForeignKeyWalker, IndexWalker, TableWalker, Walker,
};
use crate::error::{Error, Result};

/// An ID addressing one of the [`Database`] arenas.
pub trait ArenaId: Copy + std::fmt::Display {
    /// Entity kind, for messages.
    const KIND: &'static str;

    /// Position in the arena.
    fn index(self) -> usize;

    /// Number of entities in this ID's arena.
    fn arena_len(db: &Database) -> usize;
}

macro_rules! arena_id {
    ($($id:ty => $field:ident, $kind:literal;)*) => {
        $(
            impl ArenaId for $id {
                const KIND: &'static str = $kind;

                fn index(self) -> usize {
                    <$id>::index(self)
                }

                fn arena_len(db: &Database) -> usize {
                    db.$field.len()
                }
            }
        )*
    };
}

arena_id! {
    TableId => tables, "table";
    ColumnId => columns, "column";
    EnumId => enums, "enum";
    IndexId => indexes, "index";
    IndexColumnId => index_columns, "index column";
    ForeignKeyId => foreign_keys, "foreign key";
    ForeignKeyColumnId => foreign_key_columns, "foreign key column";
    ExtensionId => extensions, "extension";
}

/// A named schema snapshot.
///
/// All entities are owned here and addressed by their arena IDs. The value is
/// built once (by a compiler or the describer) and then only read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub(super) name: String,
    #[serde(default)]
    pub(super) tables: Vec<Table>,
    #[serde(default)]
    pub(super) columns: Vec<Column>,
    #[serde(default)]
    pub(super) enums: Vec<Enum>,
    #[serde(default)]
    pub(super) indexes: Vec<Index>,
    #[serde(default)]
    pub(super) index_columns: Vec<IndexColumn>,
    #[serde(default)]
    pub(super) foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub(super) foreign_key_columns: Vec<ForeignKeyColumn>,
    #[serde(default)]
    pub(super) extensions: Vec<Extension>,
}

impl Database {
    /// Create an empty database for the named schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load a snapshot from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let db: Database = serde_json::from_str(json)?;
        db.validate()?;
        Ok(db)
    }

    /// Serialize the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the database holds no entities at all.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.enums.is_empty() && self.extensions.is_empty()
    }

    // Construction

    /// Add a table.
    pub fn add_table(&mut self, table: Table) -> TableId {
        self.tables.push(table);
        TableId::from_index(self.tables.len() - 1)
    }

    /// Add a column.
    pub fn add_column(&mut self, column: Column) -> ColumnId {
        self.columns.push(column);
        ColumnId::from_index(self.columns.len() - 1)
    }

    /// Add an enum type.
    pub fn add_enum(&mut self, enum_type: Enum) -> EnumId {
        self.enums.push(enum_type);
        EnumId::from_index(self.enums.len() - 1)
    }

    /// Add an index without columns.
    pub fn add_index(&mut self, index: Index) -> IndexId {
        self.indexes.push(index);
        IndexId::from_index(self.indexes.len() - 1)
    }

    /// Append a column to an index.
    pub fn add_index_column(&mut self, column: IndexColumn) -> IndexColumnId {
        self.index_columns.push(column);
        IndexColumnId::from_index(self.index_columns.len() - 1)
    }

    /// Add an index over the given columns, all ascending.
    pub fn add_index_on(
        &mut self,
        index: Index,
        columns: impl IntoIterator<Item = ColumnId>,
    ) -> IndexId {
        let id = self.add_index(index);
        for column in columns {
            self.add_index_column(IndexColumn {
                index: id,
                column,
                sort_order: SortOrder::Ascending,
            });
        }
        id
    }

    /// Add a foreign key without columns.
    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) -> ForeignKeyId {
        self.foreign_keys.push(foreign_key);
        ForeignKeyId::from_index(self.foreign_keys.len() - 1)
    }

    /// Append a column mapping to a foreign key.
    pub fn add_foreign_key_column(&mut self, column: ForeignKeyColumn) -> ForeignKeyColumnId {
        self.foreign_key_columns.push(column);
        ForeignKeyColumnId::from_index(self.foreign_key_columns.len() - 1)
    }

    /// Add a foreign key mapping `(constrained, referenced)` column pairs.
    pub fn add_foreign_key_on(
        &mut self,
        foreign_key: ForeignKey,
        columns: impl IntoIterator<Item = (ColumnId, ColumnId)>,
    ) -> ForeignKeyId {
        let id = self.add_foreign_key(foreign_key);
        for (constrained_column, referenced_column) in columns {
            self.add_foreign_key_column(ForeignKeyColumn {
                foreign_key: id,
                constrained_column,
                referenced_column,
            });
        }
        id
    }

    /// Add an extension.
    pub fn add_extension(&mut self, extension: Extension) -> ExtensionId {
        self.extensions.push(extension);
        ExtensionId::from_index(self.extensions.len() - 1)
    }

    // Lookup

    /// Walk any entity by ID.
    pub fn walk<I>(&self, id: I) -> Walker<'_, I> {
        Walker { id, db: self }
    }

    /// Whether the entity with this ID exists here.
    pub fn contains<I: ArenaId>(&self, id: I) -> bool {
        id.index() < I::arena_len(self)
    }

    /// First table with the given name.
    pub fn find_table(&self, name: &str) -> Option<TableWalker<'_>> {
        self.walk_tables().find(|table| table.name() == name)
    }

    /// First enum with the given name.
    pub fn find_enum(&self, name: &str) -> Option<EnumWalker<'_>> {
        self.walk_enums().find(|e| e.name() == name)
    }

    /// First extension with the given name.
    pub fn find_extension(&self, name: &str) -> Option<ExtensionWalker<'_>> {
        self.walk_extensions().find(|ext| ext.name() == name)
    }

    /// All tables in storage order.
    pub fn walk_tables(&self) -> impl Iterator<Item = TableWalker<'_>> + '_ {
        (0..self.tables.len()).map(move |i| self.walk(TableId::from_index(i)))
    }

    /// All columns in storage order.
    pub fn walk_columns(&self) -> impl Iterator<Item = ColumnWalker<'_>> + '_ {
        (0..self.columns.len()).map(move |i| self.walk(ColumnId::from_index(i)))
    }

    /// All enums in storage order.
    pub fn walk_enums(&self) -> impl Iterator<Item = EnumWalker<'_>> + '_ {
        (0..self.enums.len()).map(move |i| self.walk(EnumId::from_index(i)))
    }

    /// All indexes in storage order.
    pub fn walk_indexes(&self) -> impl Iterator<Item = IndexWalker<'_>> + '_ {
        (0..self.indexes.len()).map(move |i| self.walk(IndexId::from_index(i)))
    }

    /// All foreign keys in storage order.
    pub fn walk_foreign_keys(&self) -> impl Iterator<Item = ForeignKeyWalker<'_>> + '_ {
        (0..self.foreign_keys.len()).map(move |i| self.walk(ForeignKeyId::from_index(i)))
    }

    /// All extensions in storage order.
    pub fn walk_extensions(&self) -> impl Iterator<Item = ExtensionWalker<'_>> + '_ {
        (0..self.extensions.len()).map(move |i| self.walk(ExtensionId::from_index(i)))
    }

    /// Names of all tables in storage order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    // Validation

    /// Check ID cross-references and uniqueness invariants.
    pub fn validate(&self) -> Result<()> {
        unique_names(self, "table", self.tables.iter().map(|t| t.name.as_str()))?;
        unique_names(self, "enum", self.enums.iter().map(|e| e.name.as_str()))?;
        unique_names(
            self,
            "extension",
            self.extensions.iter().map(|e| e.name.as_str()),
        )?;

        for (i, column) in self.columns.iter().enumerate() {
            if column.table.index() >= self.tables.len() {
                return Err(self.invalid(format!(
                    "column {} ({}) references unknown table {}",
                    i, column.name, column.table
                )));
            }
            if let Some(enum_id) = column.column_type.enum_id() {
                if enum_id.index() >= self.enums.len() {
                    return Err(self.invalid(format!(
                        "column {} ({}) references unknown enum {}",
                        i, column.name, enum_id
                    )));
                }
            }
        }

        for e in &self.enums {
            let mut seen = HashSet::new();
            if let Some(dup) = e.values.iter().find(|v| !seen.insert(v.as_str())) {
                return Err(self.invalid(format!("enum {} repeats value {:?}", e.name, dup)));
            }
        }

        let mut primary_keys = HashSet::new();
        for (i, index) in self.indexes.iter().enumerate() {
            if index.table.index() >= self.tables.len() {
                return Err(self.invalid(format!(
                    "index {} references unknown table {}",
                    index.name, index.table
                )));
            }
            if index.kind == IndexKind::PrimaryKey && !primary_keys.insert(index.table) {
                return Err(self.invalid(format!(
                    "table {} has more than one primary key",
                    self.tables[index.table.index()].name
                )));
            }
            let id = IndexId::from_index(i);
            let mut count = 0;
            for entry in self.index_columns.iter().filter(|c| c.index == id) {
                count += 1;
                let column = self.columns.get(entry.column.index()).ok_or_else(|| {
                    self.invalid(format!(
                        "index {} references unknown column {}",
                        index.name, entry.column
                    ))
                })?;
                if column.table != index.table {
                    return Err(self.invalid(format!(
                        "index {} covers column {} of another table",
                        index.name, column.name
                    )));
                }
            }
            if count == 0 {
                return Err(self.invalid(format!("index {} has no columns", index.name)));
            }
        }
        if let Some(entry) = self
            .index_columns
            .iter()
            .find(|c| c.index.index() >= self.indexes.len())
        {
            return Err(self.invalid(format!(
                "index column references unknown index {}",
                entry.index
            )));
        }

        for (i, fk) in self.foreign_keys.iter().enumerate() {
            for table in [fk.constrained_table, fk.referenced_table] {
                if table.index() >= self.tables.len() {
                    return Err(self.invalid(format!(
                        "foreign key {} references unknown table {}",
                        fk.constraint_name, table
                    )));
                }
            }
            let id = ForeignKeyId::from_index(i);
            let mut count = 0;
            for entry in self.foreign_key_columns.iter().filter(|c| c.foreign_key == id) {
                count += 1;
                for (column, table) in [
                    (entry.constrained_column, fk.constrained_table),
                    (entry.referenced_column, fk.referenced_table),
                ] {
                    let column = self.columns.get(column.index()).ok_or_else(|| {
                        self.invalid(format!(
                            "foreign key {} references unknown column {}",
                            fk.constraint_name, column
                        ))
                    })?;
                    if column.table != table {
                        return Err(self.invalid(format!(
                            "foreign key {} maps column {} of the wrong table",
                            fk.constraint_name, column.name
                        )));
                    }
                }
            }
            if count == 0 {
                return Err(self.invalid(format!(
                    "foreign key {} has no columns",
                    fk.constraint_name
                )));
            }
        }
        if let Some(entry) = self
            .foreign_key_columns
            .iter()
            .find(|c| c.foreign_key.index() >= self.foreign_keys.len())
        {
            return Err(self.invalid(format!(
                "foreign key column references unknown foreign key {}",
                entry.foreign_key
            )));
        }

        Ok(())
    }

    fn invalid(&self, message: String) -> Error {
        Error::InvalidSchema {
            schema: self.name.clone(),
            message,
        }
    }
}

fn unique_names<'a>(
    db: &Database,
    kind: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(db.invalid(format!("duplicate {kind} name {name:?}")));
        }
    }
    Ok(())
}
