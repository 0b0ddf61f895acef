//! Schema diffing.
//!
//! Compares two [`Database`] snapshots and produces the ordered list of
//! [`MigrationStep`]s that turns the previous one into the next one.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::steps::{ColumnChanges, ExtensionChanges, MigrationStep, TableChange};
use crate::connector::Connector;
use crate::error::Result;
use crate::schema::{
    ColumnId, ColumnWalker, Database, ForeignKeyWalker, IndexWalker, Pair, SortOrder, TableId,
    TableWalker,
};

/// Computes migration steps between two schema snapshots.
pub struct Differ<'c> {
    connector: &'c dyn Connector,
}

impl<'c> Differ<'c> {
    /// Create a differ for the given dialect.
    pub fn new(connector: &'c dyn Connector) -> Self {
        Self { connector }
    }

    /// Diff `prev` against `next`.
    ///
    /// Both databases are validated first. The result is sorted by step
    /// precedence, then by the ID of the step's primary entity.
    pub fn diff(&self, prev: &Database, next: &Database) -> Result<Vec<MigrationStep>> {
        prev.validate()?;
        next.validate()?;

        let ctx = DiffContext::new(self.connector, Pair::new(prev, next));
        debug!(
            dialect = self.connector.name(),
            created = ctx.created_tables.len(),
            dropped = ctx.dropped_tables.len(),
            matched = ctx.table_pairs.len(),
            "matched tables"
        );

        let mut steps = Vec::new();
        diff_extensions(&ctx, &mut steps);
        diff_enums(&ctx, &mut steps);
        diff_created_tables(&ctx, &mut steps);
        diff_dropped_tables(&ctx, &mut steps);
        for pair in &ctx.table_pairs {
            diff_indexes(&ctx, pair, &mut steps);
            diff_foreign_keys(&ctx, pair, &mut steps);
            diff_table_columns(pair, &mut steps);
        }

        steps.sort_by_key(MigrationStep::sort_key);
        debug!(steps = steps.len(), "diff complete");
        Ok(steps)
    }
}

/// Name-based cross reference between the two snapshots, rebuilt per diff.
struct DiffContext<'a> {
    schemas: Pair<&'a Database>,
    created_tables: Vec<TableWalker<'a>>,
    dropped_tables: Vec<TableWalker<'a>>,
    table_pairs: Vec<TablePair<'a>>,
    /// `(table, column)` names of columns that get dropped and recreated.
    recreated_columns: HashSet<(&'a str, &'a str)>,
}

struct TablePair<'a> {
    tables: Pair<TableWalker<'a>>,
    created_columns: Vec<ColumnId>,
    dropped_columns: Vec<ColumnId>,
    column_pairs: Vec<(Pair<ColumnWalker<'a>>, ColumnChanges)>,
}

impl<'a> DiffContext<'a> {
    fn new(connector: &dyn Connector, schemas: Pair<&'a Database>) -> Self {
        let next_tables: HashMap<&str, TableWalker<'a>> = schemas
            .next
            .walk_tables()
            .map(|table| (table.name(), table))
            .collect();
        let prev_names: HashSet<&str> = schemas.prev.walk_tables().map(|t| t.name()).collect();

        let mut dropped_tables = Vec::new();
        let mut table_pairs = Vec::new();
        for prev in schemas.prev.walk_tables() {
            match next_tables.get(prev.name()) {
                Some(next) => table_pairs.push(TablePair::new(connector, Pair::new(prev, *next))),
                None => dropped_tables.push(prev),
            }
        }
        let created_tables = schemas
            .next
            .walk_tables()
            .filter(|table| !prev_names.contains(table.name()))
            .collect();

        let recreated_columns = table_pairs
            .iter()
            .flat_map(|pair| {
                pair.column_pairs
                    .iter()
                    .filter(|(_, changes)| changes.requires_recreate())
                    .map(|(columns, _)| (columns.next.table().name(), columns.next.name()))
            })
            .collect();

        Self {
            schemas,
            created_tables,
            dropped_tables,
            table_pairs,
            recreated_columns,
        }
    }

    fn is_recreated(&self, column: ColumnWalker<'a>) -> bool {
        self.recreated_columns
            .contains(&(column.table().name(), column.name()))
    }
}

impl<'a> TablePair<'a> {
    fn new(connector: &dyn Connector, tables: Pair<TableWalker<'a>>) -> Self {
        let next_columns: HashMap<&str, ColumnWalker<'a>> = tables
            .next
            .columns()
            .map(|column| (column.name(), column))
            .collect();
        let prev_names: HashSet<&str> = tables.prev.columns().map(|c| c.name()).collect();

        let mut dropped_columns = Vec::new();
        let mut column_pairs = Vec::new();
        for prev in tables.prev.columns() {
            match next_columns.get(prev.name()) {
                Some(next) => {
                    let columns = Pair::new(prev, *next);
                    column_pairs.push((columns, column_changes(connector, columns)));
                }
                None => dropped_columns.push(prev.id),
            }
        }
        let created_columns = tables
            .next
            .columns()
            .filter(|column| !prev_names.contains(column.name()))
            .map(|column| column.id)
            .collect();

        Self {
            tables,
            created_columns,
            dropped_columns,
            column_pairs,
        }
    }

    fn ids(&self) -> Pair<TableId> {
        self.tables.map(|table| table.id)
    }
}

fn column_changes(connector: &dyn Connector, columns: Pair<ColumnWalker<'_>>) -> ColumnChanges {
    let type_change = connector.column_type_change(columns);
    let Pair { prev, next } = columns;

    // The sequence owns the default of an auto-increment column.
    let both_auto_increment = prev.is_auto_increment() && next.is_auto_increment();
    let default_changed = !both_auto_increment
        && match (prev.default(), next.default()) {
            (Some(a), Some(b)) => !a.same_as(b),
            (None, None) => false,
            _ => true,
        };

    ColumnChanges::new(
        type_change,
        default_changed,
        prev.arity() != next.arity(),
        prev.is_auto_increment() != next.is_auto_increment(),
    )
}

fn diff_extensions(ctx: &DiffContext<'_>, steps: &mut Vec<MigrationStep>) {
    for prev in ctx.schemas.prev.walk_extensions() {
        match ctx.schemas.next.find_extension(prev.name()) {
            None => steps.push(MigrationStep::DropExtension { extension: prev.id }),
            Some(next) => {
                // Only pinned values on the target side are enforced.
                let changes = ExtensionChanges {
                    version: next.version().is_some() && next.version() != prev.version(),
                    schema: next.schema().is_some() && next.schema() != prev.schema(),
                };
                if !changes.is_empty() {
                    steps.push(MigrationStep::AlterExtension {
                        extensions: Pair::new(prev.id, next.id),
                        changes,
                    });
                }
            }
        }
    }
    for next in ctx.schemas.next.walk_extensions() {
        if ctx.schemas.prev.find_extension(next.name()).is_none() {
            steps.push(MigrationStep::CreateExtension { extension: next.id });
        }
    }
}

fn diff_enums(ctx: &DiffContext<'_>, steps: &mut Vec<MigrationStep>) {
    for prev in ctx.schemas.prev.walk_enums() {
        let Some(next) = ctx.schemas.next.find_enum(prev.name()) else {
            steps.push(MigrationStep::DropEnum { enum_id: prev.id });
            continue;
        };

        let created_variants: Vec<String> = next
            .values()
            .iter()
            .filter(|value| !prev.values().contains(*value))
            .cloned()
            .collect();
        let dropped_variants: Vec<String> = prev
            .values()
            .iter()
            .filter(|value| !next.values().contains(*value))
            .cloned()
            .collect();

        if !created_variants.is_empty() || !dropped_variants.is_empty() {
            steps.push(MigrationStep::AlterEnum {
                enums: Pair::new(prev.id, next.id),
                created_variants,
                dropped_variants,
            });
        }
    }
    for next in ctx.schemas.next.walk_enums() {
        if ctx.schemas.prev.find_enum(next.name()).is_none() {
            steps.push(MigrationStep::CreateEnum { enum_id: next.id });
        }
    }
}

fn diff_created_tables(ctx: &DiffContext<'_>, steps: &mut Vec<MigrationStep>) {
    for table in &ctx.created_tables {
        steps.push(MigrationStep::CreateTable { table: table.id });
        for fk in table.foreign_keys() {
            steps.push(MigrationStep::AddForeignKey { foreign_key: fk.id });
        }
        for index in table.secondary_indexes() {
            steps.push(MigrationStep::CreateIndex { index: index.id });
        }
    }
}

fn diff_dropped_tables(ctx: &DiffContext<'_>, steps: &mut Vec<MigrationStep>) {
    for table in &ctx.dropped_tables {
        steps.push(MigrationStep::DropTable { table: table.id });
        for fk in table.foreign_keys() {
            steps.push(MigrationStep::DropForeignKey { foreign_key: fk.id });
        }
    }
}

/// Ordered `(column name, sort order)` list identifying an index's shape.
fn index_shape(index: IndexWalker<'_>) -> Vec<(&str, SortOrder)> {
    index
        .columns()
        .map(|entry| (entry.column().name(), entry.sort_order()))
        .collect()
}

fn indexes_match(indexes: Pair<IndexWalker<'_>>) -> bool {
    indexes.prev.kind() == indexes.next.kind()
        && indexes.prev.algorithm() == indexes.next.algorithm()
        && index_shape(indexes.prev) == index_shape(indexes.next)
}

fn diff_indexes<'a>(
    ctx: &DiffContext<'a>,
    pair: &TablePair<'a>,
    steps: &mut Vec<MigrationStep>,
) {
    let prev_indexes: Vec<IndexWalker<'a>> = pair.tables.prev.secondary_indexes().collect();
    let mut matched = vec![false; prev_indexes.len()];

    for next in pair.tables.next.secondary_indexes() {
        let found = prev_indexes
            .iter()
            .enumerate()
            .find(|(i, prev)| !matched[*i] && indexes_match(Pair::new(**prev, next)));

        let Some((i, prev)) = found else {
            steps.push(MigrationStep::CreateIndex { index: next.id });
            continue;
        };
        matched[i] = true;

        // Dropping a recreated column takes its indexes with it.
        if next.columns().any(|entry| ctx.is_recreated(entry.column())) {
            steps.push(MigrationStep::CreateIndex { index: next.id });
        } else if prev.name() != next.name() {
            steps.push(MigrationStep::RenameIndex {
                indexes: Pair::new(prev.id, next.id),
            });
        }
    }

    for (prev, _) in prev_indexes.iter().zip(&matched).filter(|(_, m)| !**m) {
        steps.push(MigrationStep::DropIndex { index: prev.id });
    }
}

fn foreign_keys_match<'a>(ctx: &DiffContext<'a>, fks: Pair<ForeignKeyWalker<'a>>) -> bool {
    let Pair { prev, next } = fks;
    prev.referenced_table().name() == next.referenced_table().name()
        && prev.constrained_column_names() == next.constrained_column_names()
        && prev.referenced_column_names() == next.referenced_column_names()
        && prev.on_delete() == next.on_delete()
        && prev.on_update() == next.on_update()
        && !next.constrained_columns().any(|c| ctx.is_recreated(c))
        && !next.referenced_columns().any(|c| ctx.is_recreated(c))
}

fn diff_foreign_keys<'a>(
    ctx: &DiffContext<'a>,
    pair: &TablePair<'a>,
    steps: &mut Vec<MigrationStep>,
) {
    let prev_fks: Vec<ForeignKeyWalker<'a>> = pair.tables.prev.foreign_keys().collect();
    let mut matched = vec![false; prev_fks.len()];

    for next in pair.tables.next.foreign_keys() {
        let found = prev_fks
            .iter()
            .enumerate()
            .find(|(i, prev)| !matched[*i] && foreign_keys_match(ctx, Pair::new(**prev, next)));

        let Some((i, prev)) = found else {
            steps.push(MigrationStep::AddForeignKey { foreign_key: next.id });
            continue;
        };
        matched[i] = true;

        let implicit = prev.is_implicit_many_to_many_fk() && next.is_implicit_many_to_many_fk();
        if prev.constraint_name() != next.constraint_name() && !implicit {
            steps.push(MigrationStep::RenameForeignKey {
                foreign_keys: Pair::new(prev.id, next.id),
            });
        }
    }

    for (prev, _) in prev_fks.iter().zip(&matched).filter(|(_, m)| !**m) {
        steps.push(MigrationStep::DropForeignKey { foreign_key: prev.id });
    }
}

fn diff_table_columns(pair: &TablePair<'_>, steps: &mut Vec<MigrationStep>) {
    let recreated: HashSet<ColumnId> = pair
        .column_pairs
        .iter()
        .filter(|(_, changes)| changes.requires_recreate())
        .map(|(columns, _)| columns.next.id)
        .collect();

    let primary_keys = pair.tables.map(|table| table.primary_key());
    let (drop_pk, rename_pk, add_pk) = match (primary_keys.prev, primary_keys.next) {
        (Some(_), None) => (true, false, false),
        (None, Some(_)) => (false, false, true),
        (Some(prev), Some(next)) => {
            let changed = index_shape(prev) != index_shape(next)
                || next
                    .columns()
                    .any(|entry| recreated.contains(&entry.column().id));
            (changed, !changed && prev.name() != next.name(), changed)
        }
        (None, None) => (false, false, false),
    };

    let mut changes = Vec::new();
    if drop_pk {
        changes.push(TableChange::DropPrimaryKey);
    }
    if rename_pk {
        changes.push(TableChange::RenamePrimaryKey);
    }
    changes.extend(
        pair.dropped_columns
            .iter()
            .map(|&column| TableChange::DropColumn { column }),
    );
    changes.extend(
        pair.created_columns
            .iter()
            .map(|&column| TableChange::AddColumn { column }),
    );

    for &(columns, column_changes) in &pair.column_pairs {
        if !column_changes.differs_in_something() {
            continue;
        }
        let columns = columns.map(|column| column.id);
        changes.push(if column_changes.requires_recreate() {
            TableChange::DropAndRecreateColumn {
                columns,
                changes: column_changes,
            }
        } else {
            TableChange::AlterColumn {
                columns,
                changes: column_changes,
            }
        });
    }

    if add_pk {
        changes.push(TableChange::AddPrimaryKey);
    }

    if !changes.is_empty() {
        steps.push(MigrationStep::AlterTable {
            tables: pair.ids(),
            changes,
        });
    }
}
