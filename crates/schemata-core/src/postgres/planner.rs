//! Rendering of migration steps into Postgres DDL.

use crate::migration::{
    ColumnChanges, ExtensionChanges, Migration, MigrationError, MigrationPlan, MigrationStep,
    Planner, Statement, Step, TableChange,
};
use crate::schema::{
    ArenaId, ColumnArity, ColumnTypeFamily, ColumnWalker, Database, DefaultValue, EnumId,
    ExtensionId, IndexAlgorithm, IndexWalker, Pair, SortOrder, TableId, TableWalker,
};

use super::connector::PostgresConnector;
use super::types::PostgresType;

type Result<T> = std::result::Result<T, MigrationError>;

/// Renders [`MigrationStep`]s as Postgres statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresPlanner {
    connector: PostgresConnector,
}

impl PostgresPlanner {
    /// Create a planner.
    pub fn new() -> Self {
        Self::default()
    }

    fn render_step(&self, schemas: Pair<&Database>, step: &MigrationStep) -> Result<Statement> {
        let Pair { prev, next } = schemas;
        match step {
            MigrationStep::DropExtension { extension } => {
                let name = prev.walk(*extension).name();
                Ok(Statement::new(format!("Drop extension {name}"))
                    .with_step(Step::new(format!("DROP EXTENSION {}", quote_ident(name)))))
            }
            MigrationStep::CreateExtension { extension } => {
                let extension = next.walk(*extension);
                let mut cmd = format!(
                    "CREATE EXTENSION IF NOT EXISTS {}",
                    quote_ident(extension.name())
                );
                if let Some(schema) = extension.schema() {
                    cmd.push_str(&format!(" WITH SCHEMA {}", quote_ident(schema)));
                }
                if let Some(version) = extension.version() {
                    cmd.push_str(&format!(" VERSION {}", quote_literal(version)));
                }
                Ok(Statement::new(format!("Create extension {}", extension.name()))
                    .with_step(Step::new(cmd)))
            }
            MigrationStep::AlterExtension {
                extensions,
                changes,
            } => Ok(self.render_alter_extension(next, extensions.next, *changes)),
            MigrationStep::CreateEnum { enum_id } => {
                let e = next.walk(*enum_id);
                let values: Vec<String> = e.values().iter().map(|v| quote_literal(v)).collect();
                let cmd = format!(
                    "CREATE TYPE {} AS ENUM ({})",
                    quote_ident(e.name()),
                    values.join(", ")
                );
                Ok(Statement::new(format!("Create enum {}", e.name())).with_step(Step::new(cmd)))
            }
            MigrationStep::AlterEnum {
                enums,
                created_variants,
                dropped_variants,
            } => self.render_alter_enum(schemas, *enums, created_variants, dropped_variants),
            MigrationStep::DropForeignKey { foreign_key } => {
                let fk = prev.walk(*foreign_key);
                Ok(
                    Statement::new(format!("Drop foreign key {}", fk.constraint_name())).with_step(
                        Step::new(format!(
                            "ALTER TABLE {} DROP CONSTRAINT {}",
                            quote_ident(fk.table().name()),
                            quote_ident(fk.constraint_name())
                        )),
                    ),
                )
            }
            MigrationStep::DropIndex { index } => {
                let name = prev.walk(*index).name();
                Ok(Statement::new(format!("Drop index {name}"))
                    .with_step(Step::new(format!("DROP INDEX {}", quote_ident(name)))))
            }
            MigrationStep::AlterTable { tables, changes } => {
                self.render_alter_table(schemas, *tables, changes)
            }
            MigrationStep::DropTable { table } => {
                let name = prev.walk(*table).name();
                Ok(Statement::new(format!("Drop table {name}"))
                    .with_step(Step::new(format!("DROP TABLE {}", quote_ident(name)))))
            }
            MigrationStep::DropEnum { enum_id } => {
                let name = prev.walk(*enum_id).name();
                Ok(Statement::new(format!("Drop enum {name}"))
                    .with_step(Step::new(format!("DROP TYPE {}", quote_ident(name)))))
            }
            MigrationStep::CreateTable { table } => self.render_create_table(next.walk(*table)),
            MigrationStep::CreateIndex { index } => Ok(render_create_index(next.walk(*index))),
            MigrationStep::RenameForeignKey { foreign_keys } => {
                let fks = schemas.zip(*foreign_keys).map(|(db, id)| db.walk(id));
                Ok(Statement::new(format!(
                    "Rename foreign key {} to {}",
                    fks.prev.constraint_name(),
                    fks.next.constraint_name()
                ))
                .with_step(Step::new(format!(
                    "ALTER TABLE {} RENAME CONSTRAINT {} TO {}",
                    quote_ident(fks.next.table().name()),
                    quote_ident(fks.prev.constraint_name()),
                    quote_ident(fks.next.constraint_name())
                ))))
            }
            MigrationStep::AddForeignKey { foreign_key } => {
                let fk = next.walk(*foreign_key);
                let constrained: Vec<String> = fk
                    .constrained_column_names()
                    .into_iter()
                    .map(quote_ident)
                    .collect();
                let referenced: Vec<String> = fk
                    .referenced_column_names()
                    .into_iter()
                    .map(quote_ident)
                    .collect();
                Ok(
                    Statement::new(format!("Add foreign key {}", fk.constraint_name())).with_step(
                        Step::new(format!(
                            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) \
                             ON DELETE {} ON UPDATE {}",
                            quote_ident(fk.table().name()),
                            quote_ident(fk.constraint_name()),
                            constrained.join(", "),
                            quote_ident(fk.referenced_table().name()),
                            referenced.join(", "),
                            fk.on_delete().as_sql(),
                            fk.on_update().as_sql()
                        )),
                    ),
                )
            }
            MigrationStep::RenameIndex { indexes } => {
                let names = schemas.zip(*indexes).map(|(db, id)| db.walk(id).name());
                Ok(
                    Statement::new(format!("Rename index {} to {}", names.prev, names.next))
                        .with_step(Step::new(format!(
                            "ALTER INDEX {} RENAME TO {}",
                            quote_ident(names.prev),
                            quote_ident(names.next)
                        ))),
                )
            }
        }
    }

    fn render_alter_extension(
        &self,
        next: &Database,
        extension: ExtensionId,
        changes: ExtensionChanges,
    ) -> Statement {
        let extension = next.walk(extension);
        let name = quote_ident(extension.name());
        let mut statement = Statement::new(format!("Alter extension {}", extension.name()));
        if let Some(version) = extension.version().filter(|_| changes.version) {
            statement.push(Step::new(format!(
                "ALTER EXTENSION {name} UPDATE TO {}",
                quote_literal(version)
            )));
        }
        if let Some(schema) = extension.schema().filter(|_| changes.schema) {
            statement.push(Step::new(format!(
                "ALTER EXTENSION {name} SET SCHEMA {}",
                quote_ident(schema)
            )));
        }
        statement
    }

    fn render_alter_enum(
        &self,
        schemas: Pair<&Database>,
        enums: Pair<EnumId>,
        created: &[String],
        dropped: &[String],
    ) -> Result<Statement> {
        let enums = schemas.zip(enums).map(|(db, id)| db.walk(id));
        let mut statement = Statement::new(format!("Alter enum {}", enums.next.name()));
        let values = enums.next.values();

        if dropped.is_empty() {
            for variant in created {
                let cmd = format!(
                    "ALTER TYPE {} ADD VALUE {}",
                    quote_ident(enums.next.name()),
                    quote_literal(variant)
                );
                let position = values.iter().position(|v| v == variant).unwrap_or(0);
                // Variants are added in declaration order, so the predecessor
                // always exists by now.
                let cmd = if position > 0 {
                    format!("{cmd} AFTER {}", quote_literal(&values[position - 1]))
                } else if let Some(first) = values.iter().find(|v| !created.contains(*v)) {
                    format!("{cmd} BEFORE {}", quote_literal(first))
                } else {
                    cmd
                };
                statement.push(Step::new(cmd));
            }
            return Ok(statement);
        }

        let name = enums.next.name();
        let tmp = quote_ident(&format!("{name}_tmp"));
        let old = quote_ident(&format!("{}_old", enums.prev.name()));
        let columns: Vec<ColumnWalker<'_>> = enums.prev.columns().collect();

        statement.push(Step::new("BEGIN"));
        let quoted: Vec<String> = values.iter().map(|v| quote_literal(v)).collect();
        statement.push(
            Step::new(format!("CREATE TYPE {tmp} AS ENUM ({})", quoted.join(", ")))
                .with_comment(format!("Create temporary enum {name}_tmp")),
        );
        for column in &columns {
            let table = quote_ident(column.table().name());
            let col = quote_ident(column.name());
            if column.default().is_some() {
                statement.push(Step::new(format!(
                    "ALTER TABLE {table} ALTER COLUMN {col} DROP DEFAULT"
                )));
            }
            let array = if column.is_list() { "[]" } else { "" };
            statement.push(
                Step::new(format!(
                    "ALTER TABLE {table} ALTER COLUMN {col} TYPE {tmp}{array} \
                     USING ({col}::text{array}::{tmp}{array})"
                ))
                .with_comment(format!(
                    "Move {}.{} to the temporary enum",
                    column.table().name(),
                    column.name()
                )),
            );
        }
        statement.push(Step::new(format!(
            "ALTER TYPE {} RENAME TO {old}",
            quote_ident(enums.prev.name())
        )));
        statement.push(Step::new(format!(
            "ALTER TYPE {tmp} RENAME TO {}",
            quote_ident(name)
        )));
        statement.push(Step::new(format!("DROP TYPE {old}")));

        // Defaults dropped above come back from the target schema, as long as
        // the column still uses this enum there.
        for column in &columns {
            let target = schemas
                .next
                .find_table(column.table().name())
                .and_then(|table| table.column(column.name()))
                .filter(|c| c.enum_type().is_some_and(|e| e.name() == name));
            let Some(target) = target else { continue };
            if column.default().is_none() {
                continue;
            }
            if let Some(default) = target.default() {
                statement.push(Step::new(format!(
                    "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                    quote_ident(target.table().name()),
                    quote_ident(target.name()),
                    render_default(default)
                )));
            }
        }
        statement.push(Step::new("COMMIT"));
        Ok(statement)
    }

    fn render_create_table(&self, table: TableWalker<'_>) -> Result<Statement> {
        let mut lines = Vec::new();
        for column in table.columns() {
            lines.push(self.render_column(column)?);
        }
        if let Some(pk) = table.primary_key() {
            lines.push(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                quote_ident(pk.name()),
                quoted_column_list(pk)
            ));
        }

        let mut statement = Statement::new(format!("Create table {}", table.name())).with_step(
            Step::new(format!(
                "CREATE TABLE {} (\n    {}\n)",
                quote_ident(table.name()),
                lines.join(",\n    ")
            )),
        );
        if let Some(comment) = &table.get().comment {
            statement.push(Step::new(format!(
                "COMMENT ON TABLE {} IS {}",
                quote_ident(table.name()),
                quote_literal(comment)
            )));
        }
        for column in table.columns() {
            if let Some(comment) = &column.get().comment {
                statement.push(render_column_comment(column, comment));
            }
        }
        Ok(statement)
    }

    fn render_alter_table(
        &self,
        schemas: Pair<&Database>,
        tables: Pair<TableId>,
        changes: &[TableChange],
    ) -> Result<Statement> {
        let tables = schemas.zip(tables).map(|(db, id)| db.walk(id));
        let table_name = quote_ident(tables.next.name());

        let mut before = Vec::new();
        let mut clauses = Vec::new();
        let mut after = Vec::new();

        for change in changes {
            match change {
                TableChange::DropPrimaryKey => {
                    let pk = primary_key(tables.prev)?;
                    clauses.push(format!("DROP CONSTRAINT {}", quote_ident(pk.name())));
                }
                TableChange::RenamePrimaryKey => {
                    let prev = primary_key(tables.prev)?;
                    let next = primary_key(tables.next)?;
                    before.push(Step::new(format!(
                        "ALTER TABLE {table_name} RENAME CONSTRAINT {} TO {}",
                        quote_ident(prev.name()),
                        quote_ident(next.name())
                    )));
                }
                TableChange::DropColumn { column: id } => {
                    let prev = schemas.prev.walk(*id);
                    clauses.push(format!("DROP COLUMN {}", quote_ident(prev.name())));
                }
                TableChange::AddColumn { column: id } => {
                    let next = schemas.next.walk(*id);
                    clauses.push(format!("ADD COLUMN {}", self.render_column(next)?));
                    if let Some(comment) = &next.get().comment {
                        after.push(render_column_comment(next, comment));
                    }
                }
                TableChange::AlterColumn { columns, changes } => {
                    let columns = schemas.zip(*columns).map(|(db, id)| db.walk(id));
                    self.render_alter_column(
                        columns,
                        *changes,
                        &mut before,
                        &mut clauses,
                        &mut after,
                    )?;
                }
                TableChange::DropAndRecreateColumn { columns, .. } => {
                    let columns = schemas.zip(*columns).map(|(db, id)| db.walk(id));
                    clauses.push(format!("DROP COLUMN {}", quote_ident(columns.prev.name())));
                    clauses.push(format!("ADD COLUMN {}", self.render_column(columns.next)?));
                }
                TableChange::AddPrimaryKey => {
                    let pk = primary_key(tables.next)?;
                    clauses.push(format!(
                        "ADD CONSTRAINT {} PRIMARY KEY ({})",
                        quote_ident(pk.name()),
                        quoted_column_list(pk)
                    ));
                }
            }
        }

        let mut statement = Statement::new(format!("Alter table {}", tables.next.name()));
        for step in before {
            statement.push(step);
        }
        if !clauses.is_empty() {
            statement.push(Step::new(format!(
                "ALTER TABLE {table_name}\n    {}",
                clauses.join(",\n    ")
            )));
        }
        for step in after {
            statement.push(step);
        }
        Ok(statement)
    }

    fn render_alter_column(
        &self,
        columns: Pair<ColumnWalker<'_>>,
        changes: ColumnChanges,
        before: &mut Vec<Step>,
        clauses: &mut Vec<String>,
        after: &mut Vec<Step>,
    ) -> Result<()> {
        let Pair { prev, next } = columns;
        let table = quote_ident(next.table().name());
        let name = quote_ident(next.name());

        if changes.auto_increment_changed() {
            if next.is_auto_increment() {
                let sequence = format!("{}_{}_seq", next.table().name(), next.name());
                before.push(
                    Step::new(format!("CREATE SEQUENCE {}", quote_ident(&sequence)))
                        .with_comment(format!("Create sequence {sequence}")),
                );
                clauses.push(format!(
                    "ALTER COLUMN {name} SET DEFAULT {}",
                    render_default(&DefaultValue::Sequence(sequence.clone()))
                ));
                after.push(Step::new(format!(
                    "ALTER SEQUENCE {} OWNED BY {table}.{name}",
                    quote_ident(&sequence)
                )));
            } else {
                clauses.push(default_clause(&name, next.default()));
            }
        } else if changes.default_changed() {
            clauses.push(default_clause(&name, next.default()));
        }

        let mut set_type = changes.type_changed();
        if changes.arity_changed() {
            match (prev.arity(), next.arity()) {
                (ColumnArity::Required, ColumnArity::Nullable) => {
                    clauses.push(format!("ALTER COLUMN {name} DROP NOT NULL"));
                }
                (ColumnArity::Nullable, ColumnArity::Required) => {
                    clauses.push(format!("ALTER COLUMN {name} SET NOT NULL"));
                }
                (ColumnArity::List, ColumnArity::Nullable) => {
                    clauses.push(format!("ALTER COLUMN {name} DROP NOT NULL"));
                    set_type = true;
                }
                (ColumnArity::List, ColumnArity::Required) => {
                    clauses.push(format!("ALTER COLUMN {name} SET NOT NULL"));
                    set_type = true;
                }
                (_, ColumnArity::List) => set_type = true,
                _ => {}
            }
        }

        if set_type {
            let ty = self.render_column_type(next)?;
            clauses.push(format!(
                "ALTER COLUMN {name} SET DATA TYPE {ty} USING {name}::{ty}"
            ));
        }
        Ok(())
    }

    /// `"name" TYPE [NOT NULL] [DEFAULT value]`
    fn render_column(&self, column: ColumnWalker<'_>) -> Result<String> {
        let serial = self.serial_type(column);
        let ty = match serial {
            Some(serial) => serial.to_string(),
            None => self.render_column_type(column)?,
        };
        let mut out = format!("{} {ty}", quote_ident(column.name()));
        if column.is_required() {
            out.push_str(" NOT NULL");
        }
        if let Some(default) = column.default().filter(|_| serial.is_none()) {
            out.push_str(" DEFAULT ");
            out.push_str(&render_default(default));
        }
        Ok(out)
    }

    fn serial_type(&self, column: ColumnWalker<'_>) -> Option<&'static str> {
        if !column.is_auto_increment() || column.is_list() {
            return None;
        }
        match self.postgres_type(column)? {
            PostgresType::SmallInt => Some("SMALLSERIAL"),
            PostgresType::Integer => Some("SERIAL"),
            PostgresType::BigInt => Some("BIGSERIAL"),
            _ => None,
        }
    }

    fn postgres_type(&self, column: ColumnWalker<'_>) -> Option<PostgresType> {
        match &column.column_type().family {
            ColumnTypeFamily::Scalar(scalar) => {
                Some(self.connector.postgres_type_for_scalar(*scalar))
            }
            ColumnTypeFamily::Native(native) => PostgresType::from_native(native).ok().flatten(),
            ColumnTypeFamily::Enum(_) | ColumnTypeFamily::Unsupported(_) => None,
        }
    }

    fn render_column_type(&self, column: ColumnWalker<'_>) -> Result<String> {
        let column_type = column.column_type();
        let base = match &column_type.family {
            ColumnTypeFamily::Enum(id) => quote_ident(column.db.walk(*id).name()),
            ColumnTypeFamily::Scalar(_) | ColumnTypeFamily::Native(_) => {
                match (self.postgres_type(column), &column_type.family) {
                    (Some(ty), _) => ty.to_string(),
                    (None, ColumnTypeFamily::Native(native)) => native.to_string(),
                    (None, _) => column_type.raw.clone(),
                }
            }
            ColumnTypeFamily::Unsupported(name) => {
                let raw = if column_type.raw.is_empty() {
                    name
                } else {
                    &column_type.raw
                };
                if raw.trim().is_empty() {
                    return Err(MigrationError::UnrenderableType {
                        table: column.table().name().to_string(),
                        column: column.name().to_string(),
                    });
                }
                raw.clone()
            }
        };
        Ok(if column.is_list() {
            format!("{base}[]")
        } else {
            base
        })
    }
}

impl Planner for PostgresPlanner {
    fn plan(&self, migration: &Migration<'_>) -> Result<MigrationPlan> {
        let schemas = Pair::new(migration.before, migration.after);
        let mut plan = MigrationPlan::new();
        for step in &migration.changes {
            check_ids(schemas, step)?;
            plan.push(self.render_step(schemas, step)?);
        }
        Ok(plan)
    }
}

/// Reject a step whose IDs are out of range for the database they refer to.
fn check_ids(schemas: Pair<&Database>, step: &MigrationStep) -> Result<()> {
    fn check<I: ArenaId>(db: &Database, id: I, step: &MigrationStep) -> Result<()> {
        if db.contains(id) {
            Ok(())
        } else {
            Err(MigrationError::UnknownEntity {
                step: step.kind(),
                kind: I::KIND,
                id: id.to_string(),
            })
        }
    }
    fn check_pair<I: ArenaId>(
        schemas: Pair<&Database>,
        ids: Pair<I>,
        step: &MigrationStep,
    ) -> Result<()> {
        check(schemas.prev, ids.prev, step)?;
        check(schemas.next, ids.next, step)
    }

    let Pair { prev, next } = schemas;
    match step {
        MigrationStep::DropExtension { extension } => check(prev, *extension, step),
        MigrationStep::CreateExtension { extension } => check(next, *extension, step),
        MigrationStep::AlterExtension { extensions, .. } => check_pair(schemas, *extensions, step),
        MigrationStep::CreateEnum { enum_id } => check(next, *enum_id, step),
        MigrationStep::AlterEnum { enums, .. } => check_pair(schemas, *enums, step),
        MigrationStep::DropForeignKey { foreign_key } => check(prev, *foreign_key, step),
        MigrationStep::DropIndex { index } => check(prev, *index, step),
        MigrationStep::AlterTable { tables, changes } => {
            check_pair(schemas, *tables, step)?;
            for change in changes {
                match change {
                    TableChange::DropColumn { column } => check(prev, *column, step)?,
                    TableChange::AddColumn { column } => check(next, *column, step)?,
                    TableChange::AlterColumn { columns, .. }
                    | TableChange::DropAndRecreateColumn { columns, .. } => {
                        check_pair(schemas, *columns, step)?
                    }
                    TableChange::DropPrimaryKey
                    | TableChange::RenamePrimaryKey
                    | TableChange::AddPrimaryKey => {}
                }
            }
            Ok(())
        }
        MigrationStep::DropTable { table } => check(prev, *table, step),
        MigrationStep::DropEnum { enum_id } => check(prev, *enum_id, step),
        MigrationStep::CreateTable { table } => check(next, *table, step),
        MigrationStep::CreateIndex { index } => check(next, *index, step),
        MigrationStep::RenameForeignKey { foreign_keys } => {
            check_pair(schemas, *foreign_keys, step)
        }
        MigrationStep::AddForeignKey { foreign_key } => check(next, *foreign_key, step),
        MigrationStep::RenameIndex { indexes } => check_pair(schemas, *indexes, step),
    }
}

fn render_create_index(index: IndexWalker<'_>) -> Statement {
    let unique = if index.is_unique() { "UNIQUE " } else { "" };
    let using = match index.algorithm() {
        IndexAlgorithm::BTree => String::new(),
        algorithm => format!(" USING {}", algorithm.as_str()),
    };
    // Only B-tree indexes accept a sort order.
    let ordered = index.algorithm() == IndexAlgorithm::BTree;
    let columns: Vec<String> = index
        .columns()
        .map(|entry| {
            let name = quote_ident(entry.column().name());
            match (ordered, entry.sort_order()) {
                (false, _) => name,
                (true, SortOrder::Ascending) => format!("{name} ASC"),
                (true, SortOrder::Descending) => format!("{name} DESC"),
            }
        })
        .collect();

    Statement::new(format!("Create index {}", index.name())).with_step(Step::new(format!(
        "CREATE {unique}INDEX {} ON {}{using} ({})",
        quote_ident(index.name()),
        quote_ident(index.table().name()),
        columns.join(", ")
    )))
}

fn render_column_comment(column: ColumnWalker<'_>, comment: &str) -> Step {
    Step::new(format!(
        "COMMENT ON COLUMN {}.{} IS {}",
        quote_ident(column.table().name()),
        quote_ident(column.name()),
        quote_literal(comment)
    ))
}

fn default_clause(name: &str, default: Option<&DefaultValue>) -> String {
    match default {
        Some(default) => format!("ALTER COLUMN {name} SET DEFAULT {}", render_default(default)),
        None => format!("ALTER COLUMN {name} DROP DEFAULT"),
    }
}

fn primary_key(table: TableWalker<'_>) -> Result<IndexWalker<'_>> {
    table
        .primary_key()
        .ok_or_else(|| MigrationError::MissingPrimaryKey {
            table: table.name().to_string(),
        })
}

fn quoted_column_list(index: IndexWalker<'_>) -> String {
    index
        .column_names()
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Quote an identifier, doubling embedded double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Render a default value as an SQL expression.
pub fn render_default(default: &DefaultValue) -> String {
    match default {
        DefaultValue::Int(n) => n.to_string(),
        DefaultValue::Decimal(d) => d.clone(),
        DefaultValue::Bool(true) => "TRUE".to_string(),
        DefaultValue::Bool(false) => "FALSE".to_string(),
        DefaultValue::String(s) => quote_literal(s),
        DefaultValue::Bytes(bytes) => format!("'\\x{}'", hex::encode(bytes)),
        DefaultValue::Expression(expr) => expr.clone(),
        DefaultValue::Sequence(sequence) => {
            format!("nextval({})", quote_literal(&quote_ident(sequence)))
        }
    }
}
