//! Live schema introspection.
//!
//! [`Describer::describe`] loads tables, columns, enums, indexes, foreign keys
//! and extensions of one Postgres schema into a [`Database`]. Type names come
//! from `udt_name` and go through the connector's native type parser, so an
//! unknown type becomes [`ColumnTypeFamily::Unsupported`] rather than an error.

use std::collections::HashMap;

use schemata_core::schema::{
    Column, ColumnArity, ColumnId, ColumnType, ColumnTypeFamily, Database, DefaultValue, Enum,
    EnumId, Extension, ForeignKey, ForeignKeyAction, ForeignKeyColumn, ForeignKeyId, Index,
    IndexAlgorithm, IndexColumn, IndexId, SortOrder, Table, TableId,
};
use schemata_core::{Connector, PostgresConnector};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::{MigrateError, Result};

/// Fractional-seconds precision Postgres reports when none was declared.
const DEFAULT_DATETIME_PRECISION: i32 = 6;

const TABLES_QUERY: &str = r#"
SELECT c.relname::text AS name,
       obj_description(c.oid, 'pg_class')::text AS comment
FROM pg_class c
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1
  AND c.relkind IN ('r', 'p')
  AND NOT c.relispartition
ORDER BY c.relname
"#;

const ENUMS_QUERY: &str = r#"
SELECT t.typname::text AS name,
       e.enumlabel::text AS value
FROM pg_type t
JOIN pg_enum e ON e.enumtypid = t.oid
JOIN pg_namespace n ON n.oid = t.typnamespace
WHERE n.nspname = $1
ORDER BY t.typname, e.enumsortorder
"#;

const COLUMNS_QUERY: &str = r#"
SELECT c.table_name::text AS table_name,
       c.column_name::text AS column_name,
       c.data_type::text AS data_type,
       c.udt_name::text AS udt_name,
       c.character_maximum_length::int4 AS character_maximum_length,
       c.numeric_precision::int4 AS numeric_precision,
       c.numeric_scale::int4 AS numeric_scale,
       c.datetime_precision::int4 AS datetime_precision,
       c.column_default::text AS column_default,
       (c.is_nullable = 'YES')::bool AS is_nullable,
       (c.is_identity = 'YES')::bool AS is_identity,
       format_type(a.atttypid, a.atttypmod)::text AS formatted_type,
       col_description(a.attrelid, a.attnum::int4)::text AS comment
FROM information_schema.columns c
JOIN pg_attribute a
  ON a.attrelid = format('%I.%I', c.table_schema, c.table_name)::regclass
 AND a.attname = c.column_name
WHERE c.table_schema = $1
ORDER BY c.table_name, c.ordinal_position
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
SELECT con.conname::text AS constraint_name,
       src.relname::text AS table_name,
       ref.relname::text AS referenced_table,
       a.attname::text AS column_name,
       ra.attname::text AS referenced_column,
       con.confdeltype::text AS on_delete,
       con.confupdtype::text AS on_update
FROM pg_constraint con
JOIN pg_class src ON src.oid = con.conrelid
JOIN pg_class ref ON ref.oid = con.confrelid
JOIN pg_namespace n ON n.oid = con.connamespace
CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, refnum, ord)
JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.refnum
WHERE con.contype = 'f' AND n.nspname = $1
ORDER BY src.relname, con.conname, k.ord
"#;

const INDEXES_QUERY: &str = r#"
SELECT t.relname::text AS table_name,
       i.relname::text AS index_name,
       am.amname::text AS algorithm,
       ix.indisprimary AS is_primary,
       ix.indisunique AS is_unique,
       a.attname::text AS column_name,
       ((ix.indoption[(k.ord - 1)::int4]::int4 & 1) = 1)::bool AS descending
FROM pg_index ix
JOIN pg_class t ON t.oid = ix.indrelid
JOIN pg_class i ON i.oid = ix.indexrelid
JOIN pg_am am ON am.oid = i.relam
JOIN pg_namespace n ON n.oid = t.relnamespace
CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
WHERE n.nspname = $1 AND k.ord <= ix.indnkeyatts
ORDER BY t.relname, i.relname, k.ord
"#;

const EXTENSIONS_QUERY: &str = r#"
SELECT e.extname::text AS name,
       e.extversion::text AS version,
       n.nspname::text AS schema
FROM pg_extension e
JOIN pg_namespace n ON n.oid = e.extnamespace
WHERE n.nspname = $1
ORDER BY e.extname
"#;

/// Introspects a live Postgres schema.
pub struct Describer<'a> {
    pool: &'a PgPool,
    connector: PostgresConnector,
}

impl<'a> Describer<'a> {
    /// Create a describer over a connection pool.
    pub fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            connector: PostgresConnector::new(),
        }
    }

    /// Load the full schema named `schema`.
    pub async fn describe(&self, schema: &str) -> Result<Database> {
        let mut db = Database::new(schema);

        let tables = self.load_tables(&mut db, schema).await?;
        let enums = self.load_enums(&mut db, schema).await?;
        let columns = self.load_columns(&mut db, schema, &tables, &enums).await?;
        self.load_foreign_keys(&mut db, schema, &tables, &columns).await?;
        self.load_indexes(&mut db, schema, &tables, &columns).await?;
        self.load_extensions(&mut db, schema).await?;

        db.validate()?;
        tracing::info!(
            schema,
            tables = tables.len(),
            enums = enums.len(),
            "described schema"
        );
        Ok(db)
    }

    async fn fetch(&self, query: &str, schema: &str) -> Result<Vec<PgRow>> {
        let rows = sqlx::query(query).bind(schema).fetch_all(self.pool).await?;
        Ok(rows)
    }

    async fn load_tables(
        &self,
        db: &mut Database,
        schema: &str,
    ) -> Result<HashMap<String, TableId>> {
        let mut tables = HashMap::new();
        for row in self.fetch(TABLES_QUERY, schema).await? {
            let name: String = row.try_get("name")?;
            let comment: Option<String> = row.try_get("comment")?;
            let mut table = Table::new(name.clone());
            table.comment = comment;
            tables.insert(name, db.add_table(table));
        }
        tracing::debug!(schema, count = tables.len(), "loaded tables");
        Ok(tables)
    }

    async fn load_enums(
        &self,
        db: &mut Database,
        schema: &str,
    ) -> Result<HashMap<String, EnumId>> {
        let mut values: Vec<(String, Vec<String>)> = Vec::new();
        for row in self.fetch(ENUMS_QUERY, schema).await? {
            let name: String = row.try_get("name")?;
            let value: String = row.try_get("value")?;
            match values.last_mut() {
                Some((last, variants)) if *last == name => variants.push(value),
                _ => values.push((name, vec![value])),
            }
        }

        let enums: HashMap<_, _> = values
            .into_iter()
            .map(|(name, variants)| {
                let id = db.add_enum(Enum::new(name.clone(), variants));
                (name, id)
            })
            .collect();
        tracing::debug!(schema, count = enums.len(), "loaded enums");
        Ok(enums)
    }

    async fn load_columns(
        &self,
        db: &mut Database,
        schema: &str,
        tables: &HashMap<String, TableId>,
        enums: &HashMap<String, EnumId>,
    ) -> Result<HashMap<(TableId, String), ColumnId>> {
        let mut columns = HashMap::new();
        for row in self.fetch(COLUMNS_QUERY, schema).await? {
            let table_name: String = row.try_get("table_name")?;
            // Views and partitions show up in information_schema too.
            let Some(&table) = tables.get(&table_name) else {
                continue;
            };

            let info = ColumnInfo::from_row(&row)?;
            let column = info.into_column(&self.connector, table, enums)?;
            let name = column.name.clone();
            columns.insert((table, name), db.add_column(column));
        }
        tracing::debug!(schema, count = columns.len(), "loaded columns");
        Ok(columns)
    }

    async fn load_foreign_keys(
        &self,
        db: &mut Database,
        schema: &str,
        tables: &HashMap<String, TableId>,
        columns: &HashMap<(TableId, String), ColumnId>,
    ) -> Result<()> {
        let mut current: Option<(TableId, String, ForeignKeyId)> = None;
        let mut count = 0usize;
        for row in self.fetch(FOREIGN_KEYS_QUERY, schema).await? {
            let constraint_name: String = row.try_get("constraint_name")?;
            let table_name: String = row.try_get("table_name")?;
            let referenced_name: String = row.try_get("referenced_table")?;
            let (Some(&table), Some(&referenced)) =
                (tables.get(&table_name), tables.get(&referenced_name))
            else {
                // References across schemas are not part of this snapshot.
                continue;
            };

            let is_same = matches!(
                &current,
                Some((t, name, _)) if *t == table && *name == constraint_name
            );
            if !is_same {
                let on_delete: String = row.try_get("on_delete")?;
                let on_update: String = row.try_get("on_update")?;
                let foreign_key = ForeignKey::new(constraint_name.clone(), table, referenced)
                    .on_delete(parse_action(&on_delete)?)
                    .on_update(parse_action(&on_update)?);
                current = Some((table, constraint_name, db.add_foreign_key(foreign_key)));
                count += 1;
            }
            let Some(&(_, _, foreign_key)) = current.as_ref() else {
                continue;
            };

            let column_name: String = row.try_get("column_name")?;
            let referenced_column: String = row.try_get("referenced_column")?;
            db.add_foreign_key_column(ForeignKeyColumn {
                foreign_key,
                constrained_column: lookup(columns, table, &column_name)?,
                referenced_column: lookup(columns, referenced, &referenced_column)?,
            });
        }
        tracing::debug!(schema, count, "loaded foreign keys");
        Ok(())
    }

    async fn load_indexes(
        &self,
        db: &mut Database,
        schema: &str,
        tables: &HashMap<String, TableId>,
        columns: &HashMap<(TableId, String), ColumnId>,
    ) -> Result<()> {
        let mut current: Option<(TableId, String, IndexId)> = None;
        let mut count = 0usize;
        for row in self.fetch(INDEXES_QUERY, schema).await? {
            let table_name: String = row.try_get("table_name")?;
            let Some(&table) = tables.get(&table_name) else {
                continue;
            };
            let index_name: String = row.try_get("index_name")?;

            let is_same = matches!(
                &current,
                Some((t, name, _)) if *t == table && *name == index_name
            );
            if !is_same {
                let algorithm: String = row.try_get("algorithm")?;
                let is_primary: bool = row.try_get("is_primary")?;
                let is_unique: bool = row.try_get("is_unique")?;
                let index = if is_primary {
                    Index::primary_key(table, index_name.clone())
                } else if is_unique {
                    Index::unique(table, index_name.clone())
                } else {
                    Index::new(table, index_name.clone())
                };
                let index = index.with_algorithm(
                    IndexAlgorithm::from_name(&algorithm).unwrap_or_default(),
                );
                current = Some((table, index_name, db.add_index(index)));
                count += 1;
            }
            let Some(&(_, _, index)) = current.as_ref() else {
                continue;
            };

            let column_name: String = row.try_get("column_name")?;
            let descending: bool = row.try_get("descending")?;
            db.add_index_column(IndexColumn {
                index,
                column: lookup(columns, table, &column_name)?,
                sort_order: if descending {
                    SortOrder::Descending
                } else {
                    SortOrder::Ascending
                },
            });
        }
        tracing::debug!(schema, count, "loaded indexes");
        Ok(())
    }

    /// Extensions are database-wide; only those installed into the described
    /// schema belong to it.
    async fn load_extensions(&self, db: &mut Database, schema: &str) -> Result<()> {
        let mut count = 0usize;
        for row in self.fetch(EXTENSIONS_QUERY, schema).await? {
            let name: String = row.try_get("name")?;
            let version: String = row.try_get("version")?;
            let installed_in: String = row.try_get("schema")?;
            db.add_extension(
                Extension::new(name)
                    .with_version(version)
                    .with_schema(installed_in),
            );
            count += 1;
        }
        tracing::debug!(schema, count, "loaded extensions");
        Ok(())
    }
}

fn lookup(
    columns: &HashMap<(TableId, String), ColumnId>,
    table: TableId,
    name: &str,
) -> Result<ColumnId> {
    columns
        .get(&(table, name.to_string()))
        .copied()
        .ok_or_else(|| MigrateError::Introspection(format!("unknown column {name:?}")))
}

/// One row of `information_schema.columns`.
#[derive(Debug, Clone, Default)]
struct ColumnInfo {
    name: String,
    data_type: String,
    udt_name: String,
    character_maximum_length: Option<i32>,
    numeric_precision: Option<i32>,
    numeric_scale: Option<i32>,
    datetime_precision: Option<i32>,
    default: Option<String>,
    is_nullable: bool,
    is_identity: bool,
    formatted_type: String,
    comment: Option<String>,
}

impl ColumnInfo {
    fn from_row(row: &PgRow) -> Result<Self> {
        Ok(Self {
            name: row.try_get("column_name")?,
            data_type: row.try_get("data_type")?,
            udt_name: row.try_get("udt_name")?,
            character_maximum_length: row.try_get("character_maximum_length")?,
            numeric_precision: row.try_get("numeric_precision")?,
            numeric_scale: row.try_get("numeric_scale")?,
            datetime_precision: row.try_get("datetime_precision")?,
            default: row.try_get("column_default")?,
            is_nullable: row.try_get("is_nullable")?,
            is_identity: row.try_get("is_identity")?,
            formatted_type: row.try_get("formatted_type")?,
            comment: row.try_get("comment")?,
        })
    }

    fn into_column(
        self,
        connector: &PostgresConnector,
        table: TableId,
        enums: &HashMap<String, EnumId>,
    ) -> Result<Column> {
        let column_type = self.column_type(connector, enums)?;
        let default = self.default.as_deref().and_then(parse_default);
        let auto_increment =
            self.is_identity || default.as_ref().is_some_and(DefaultValue::is_sequence);

        let mut column = Column::new(table, self.name, column_type);
        column.default = default;
        column.comment = self.comment;
        column.auto_increment = auto_increment;
        Ok(column)
    }

    fn column_type(
        &self,
        connector: &PostgresConnector,
        enums: &HashMap<String, EnumId>,
    ) -> Result<ColumnType> {
        let is_array = self.data_type == "ARRAY";
        let udt = if is_array {
            self.udt_name.strip_prefix('_').unwrap_or(&self.udt_name)
        } else {
            &self.udt_name
        };
        let arity = if is_array {
            ColumnArity::List
        } else if self.is_nullable {
            ColumnArity::Nullable
        } else {
            ColumnArity::Required
        };

        Ok(match enums.get(udt) {
            Some(&id) => ColumnType::new(ColumnTypeFamily::Enum(id), arity).with_raw(udt),
            None => {
                let args = if is_array {
                    array_element_args(&self.formatted_type)
                } else {
                    self.native_args(udt)
                };
                ColumnType::new(connector.parse_native_type(udt, &args)?, arity)
            }
        })
    }

    /// Type arguments as they would be written in a declaration.
    fn native_args(&self, udt: &str) -> Vec<i64> {
        match udt {
            "numeric" => match (self.numeric_precision, self.numeric_scale) {
                (Some(p), Some(s)) => vec![i64::from(p), i64::from(s)],
                (Some(p), None) => vec![i64::from(p)],
                _ => Vec::new(),
            },
            "bpchar" | "varchar" | "bit" | "varbit" => {
                self.character_maximum_length.map(i64::from).into_iter().collect()
            }
            "time" | "timetz" | "timestamp" | "timestamptz" | "interval" => self
                .datetime_precision
                .filter(|&p| p != DEFAULT_DATETIME_PRECISION)
                .map(i64::from)
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Arguments of an array's element type, from `format_type` output such as
/// `character varying(40)[]`. information_schema reports none for arrays.
fn array_element_args(formatted: &str) -> Vec<i64> {
    let Some((_, rest)) = formatted.split_once('(') else {
        return Vec::new();
    };
    let Some((args, _)) = rest.split_once(')') else {
        return Vec::new();
    };
    args.split(',')
        .filter_map(|arg| arg.trim().parse().ok())
        .collect()
}

fn parse_action(code: &str) -> Result<ForeignKeyAction> {
    match code {
        "a" => Ok(ForeignKeyAction::NoAction),
        "r" => Ok(ForeignKeyAction::Restrict),
        "c" => Ok(ForeignKeyAction::Cascade),
        "n" => Ok(ForeignKeyAction::SetNull),
        "d" => Ok(ForeignKeyAction::SetDefault),
        other => Err(MigrateError::Introspection(format!(
            "unknown foreign key action {other:?}"
        ))),
    }
}

/// Parse a `column_default` expression as Postgres prints it.
///
/// `NULL` defaults yield `None`. Anything that is not a plain literal or a
/// `nextval` call is kept verbatim as an expression.
pub fn parse_default(text: &str) -> Option<DefaultValue> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(sequence) = parse_nextval(text) {
        return Some(DefaultValue::Sequence(sequence));
    }
    if let Some((literal, cast)) = parse_string_literal(text) {
        return Some(literal_default(literal, cast));
    }

    let (bare, _) = split_cast(text);
    let bare = strip_parens(bare);
    if bare.eq_ignore_ascii_case("null") {
        return None;
    }
    if bare.eq_ignore_ascii_case("true") {
        return Some(DefaultValue::Bool(true));
    }
    if bare.eq_ignore_ascii_case("false") {
        return Some(DefaultValue::Bool(false));
    }
    if let Ok(n) = bare.parse::<i64>() {
        return Some(DefaultValue::Int(n));
    }
    if is_decimal(bare) {
        return Some(DefaultValue::Decimal(bare.to_string()));
    }
    Some(DefaultValue::Expression(text.to_string()))
}

/// `nextval('seq'::regclass)` yields the unqualified sequence name.
fn parse_nextval(text: &str) -> Option<String> {
    let inner = text.strip_prefix("nextval(")?.strip_suffix(')')?;
    let (literal, _) = parse_string_literal(inner)?;
    let name = literal.rsplit('.').next().unwrap_or(&literal);
    let name = name
        .strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .map(|n| n.replace("\"\"", "\""))
        .unwrap_or_else(|| name.to_string());
    Some(name)
}

/// A single-quoted literal, optionally followed by a `::type` cast and
/// nothing else. Returns the unescaped value and the cast type.
fn parse_string_literal(text: &str) -> Option<(String, &str)> {
    let rest = text.strip_prefix('\'')?;
    let mut value = String::new();
    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '\'' {
            value.push(c);
            continue;
        }
        if matches!(chars.peek(), Some((_, '\''))) {
            chars.next();
            value.push('\'');
            continue;
        }
        let tail = rest[i + 1..].trim();
        return match tail.strip_prefix("::") {
            Some(cast) => Some((value, cast.trim())),
            None if tail.is_empty() => Some((value, "")),
            None => None,
        };
    }
    None
}

fn literal_default(value: String, cast: &str) -> DefaultValue {
    match cast {
        "bytea" => match value.strip_prefix("\\x").map(hex::decode) {
            Some(Ok(bytes)) => DefaultValue::Bytes(bytes),
            _ => DefaultValue::String(value),
        },
        "numeric" if is_decimal(&value) || value.parse::<i64>().is_ok() => {
            DefaultValue::Decimal(value)
        }
        "integer" | "bigint" | "smallint" => match value.parse() {
            Ok(n) => DefaultValue::Int(n),
            Err(_) => DefaultValue::String(value),
        },
        _ => DefaultValue::String(value),
    }
}

fn split_cast(text: &str) -> (&str, Option<&str>) {
    match text.split_once("::") {
        Some((value, cast)) => (value.trim(), Some(cast.trim())),
        None => (text, None),
    }
}

fn strip_parens(mut text: &str) -> &str {
    while let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        text = inner.trim();
    }
    text
}

fn is_decimal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    match digits.split_once('.') {
        Some((whole, fraction)) => {
            !(whole.is_empty() && fraction.is_empty())
                && whole.chars().all(|c| c.is_ascii_digit())
                && fraction.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schemata_core::postgres::{riskiness, PostgresType};
    use schemata_core::schema::NativeType;
    use schemata_core::ColumnTypeChange;

    #[test]
    fn test_parse_literal_defaults() {
        assert_eq!(parse_default("0"), Some(DefaultValue::Int(0)));
        assert_eq!(parse_default("'-1'::integer"), Some(DefaultValue::Int(-1)));
        assert_eq!(parse_default("(-42)"), Some(DefaultValue::Int(-42)));
        assert_eq!(parse_default("true"), Some(DefaultValue::Bool(true)));
        assert_eq!(parse_default("false"), Some(DefaultValue::Bool(false)));
        assert_eq!(
            parse_default("0.50"),
            Some(DefaultValue::Decimal("0.50".into()))
        );
        assert_eq!(
            parse_default("'1.5'::numeric"),
            Some(DefaultValue::Decimal("1.5".into()))
        );
    }

    #[test]
    fn test_parse_string_defaults() {
        assert_eq!(
            parse_default("'it''s'::character varying"),
            Some(DefaultValue::String("it's".into()))
        );
        assert_eq!(
            parse_default("'happy'::mood"),
            Some(DefaultValue::String("happy".into()))
        );
        assert_eq!(parse_default("''::text"), Some(DefaultValue::String(String::new())));
        assert_eq!(
            parse_default("'\\x0aff'::bytea"),
            Some(DefaultValue::Bytes(vec![0x0a, 0xff]))
        );
    }

    #[test]
    fn test_parse_null_and_expressions() {
        assert_eq!(parse_default("NULL::character varying"), None);
        assert_eq!(parse_default(""), None);
        assert_eq!(
            parse_default("now()"),
            Some(DefaultValue::Expression("now()".into()))
        );
        assert_eq!(
            parse_default("CURRENT_TIMESTAMP"),
            Some(DefaultValue::Expression("CURRENT_TIMESTAMP".into()))
        );
        assert_eq!(
            parse_default("'{}'::integer[]"),
            Some(DefaultValue::String("{}".into()))
        );
    }

    #[test]
    fn test_parse_nextval() {
        assert_eq!(
            parse_default("nextval('users_id_seq'::regclass)"),
            Some(DefaultValue::Sequence("users_id_seq".into()))
        );
        assert_eq!(
            parse_default("nextval('public.\"Order_id_seq\"'::regclass)"),
            Some(DefaultValue::Sequence("Order_id_seq".into()))
        );
    }

    #[test]
    fn test_array_element_args() {
        assert_eq!(array_element_args("character varying(40)[]"), vec![40]);
        assert_eq!(array_element_args("numeric(10,2)[]"), vec![10, 2]);
        assert_eq!(array_element_args("integer[]"), Vec::<i64>::new());
    }

    #[test]
    fn test_parse_action() {
        assert_eq!(parse_action("c").unwrap(), ForeignKeyAction::Cascade);
        assert_eq!(parse_action("n").unwrap(), ForeignKeyAction::SetNull);
        assert!(parse_action("x").is_err());
    }

    fn info(data_type: &str, udt_name: &str) -> ColumnInfo {
        ColumnInfo {
            name: "c".into(),
            data_type: data_type.into(),
            udt_name: udt_name.into(),
            ..ColumnInfo::default()
        }
    }

    #[test]
    fn test_column_type_from_info() {
        let connector = PostgresConnector::new();
        let enums = HashMap::new();

        let varchar = ColumnInfo {
            character_maximum_length: Some(40),
            ..info("character varying", "varchar")
        };
        assert_eq!(
            varchar.column_type(&connector, &enums).unwrap().family,
            ColumnTypeFamily::Native(NativeType::with_args("varchar", vec![40]))
        );

        let timestamp = ColumnInfo {
            datetime_precision: Some(6),
            is_nullable: true,
            ..info("timestamp with time zone", "timestamptz")
        };
        let ty = timestamp.column_type(&connector, &enums).unwrap();
        assert_eq!(ty.family, ColumnTypeFamily::Native(NativeType::new("timestamptz")));
        assert_eq!(ty.arity, ColumnArity::Nullable);

        let array = info("ARRAY", "_int4");
        let ty = array.column_type(&connector, &enums).unwrap();
        assert_eq!(ty.family, ColumnTypeFamily::Native(NativeType::new("integer")));
        assert_eq!(ty.arity, ColumnArity::List);

        let decimals = ColumnInfo {
            formatted_type: "numeric(10,2)[]".into(),
            ..info("ARRAY", "_numeric")
        };
        assert_eq!(
            decimals.column_type(&connector, &enums).unwrap().family,
            ColumnTypeFamily::Native(NativeType::with_args("numeric", vec![10, 2]))
        );

        let ltree = info("USER-DEFINED", "ltree");
        assert_eq!(
            ltree.column_type(&connector, &enums).unwrap().family,
            ColumnTypeFamily::Unsupported("ltree".into())
        );
    }

    /// What the catalog reports for a column declared with each type.
    fn declared(target: PostgresType) -> ColumnInfo {
        let (data_type, udt) = match target {
            PostgresType::Char(_) => ("character", "bpchar"),
            PostgresType::VarChar(_) => ("character varying", "varchar"),
            PostgresType::Bit(_) => ("bit", "bit"),
            PostgresType::VarBit(_) => ("bit varying", "varbit"),
            PostgresType::Numeric { .. } => ("numeric", "numeric"),
            PostgresType::Time(_) => ("time without time zone", "time"),
            PostgresType::TimeTz(_) => ("time with time zone", "timetz"),
            PostgresType::Timestamp(_) => ("timestamp without time zone", "timestamp"),
            PostgresType::TimestampTz(_) => ("timestamp with time zone", "timestamptz"),
            PostgresType::Interval(_) => ("interval", "interval"),
            other => panic!("no catalog mapping for {other}"),
        };
        let mut column = info(data_type, udt);
        match target {
            PostgresType::Char(n) | PostgresType::Bit(n) => {
                column.character_maximum_length = Some(n.unwrap_or(1) as i32);
            }
            PostgresType::VarChar(n) | PostgresType::VarBit(n) => {
                column.character_maximum_length = n.map(|n| n as i32);
            }
            PostgresType::Numeric { precision, scale } => {
                column.numeric_precision = precision.map(|p| p as i32);
                column.numeric_scale = precision.map(|_| scale.unwrap_or(0) as i32);
            }
            PostgresType::Time(p)
            | PostgresType::TimeTz(p)
            | PostgresType::Timestamp(p)
            | PostgresType::TimestampTz(p)
            | PostgresType::Interval(p) => {
                let precision = p.map_or(DEFAULT_DATETIME_PRECISION, |p| p as i32);
                column.datetime_precision = Some(precision);
            }
            _ => {}
        }
        column
    }

    #[test]
    fn test_described_types_match_their_declaration() {
        let connector = PostgresConnector::new();
        let enums = HashMap::new();
        let targets = [
            PostgresType::Char(None),
            PostgresType::Char(Some(12)),
            PostgresType::Bit(None),
            PostgresType::Bit(Some(8)),
            PostgresType::VarChar(None),
            PostgresType::VarChar(Some(255)),
            PostgresType::VarBit(None),
            PostgresType::Numeric {
                precision: None,
                scale: None,
            },
            PostgresType::Numeric {
                precision: Some(10),
                scale: None,
            },
            PostgresType::Numeric {
                precision: Some(10),
                scale: Some(2),
            },
            PostgresType::Time(None),
            PostgresType::TimeTz(None),
            PostgresType::Timestamp(None),
            PostgresType::Timestamp(Some(3)),
            PostgresType::TimestampTz(None),
            PostgresType::Interval(None),
        ];

        for target in targets {
            let family = declared(target).column_type(&connector, &enums).unwrap().family;
            let ColumnTypeFamily::Native(native) = &family else {
                panic!("{target} described as {family:?}");
            };
            let described = PostgresType::from_native(native).unwrap().unwrap();
            assert_eq!(
                riskiness(described, target),
                ColumnTypeChange::None,
                "{target} described as {described}"
            );
        }
    }

    #[test]
    fn test_enum_column_from_info() {
        let connector = PostgresConnector::new();
        let mut db = Database::new("public");
        let mood = db.add_enum(Enum::new("mood", ["happy", "sad"]));
        let enums = HashMap::from([("mood".to_string(), mood)]);

        let column = ColumnInfo {
            default: Some("'happy'::mood".into()),
            ..info("USER-DEFINED", "mood")
        };
        let table = db.add_table(Table::new("people"));
        let column = column.into_column(&connector, table, &enums).unwrap();
        assert_eq!(column.column_type.family, ColumnTypeFamily::Enum(mood));
        assert_eq!(column.default, Some(DefaultValue::String("happy".into())));
        assert!(!column.auto_increment);
    }

    #[test]
    fn test_serial_and_identity_are_auto_increment() {
        let connector = PostgresConnector::new();
        let enums = HashMap::new();
        let mut db = Database::new("public");
        let table = db.add_table(Table::new("users"));

        let serial = ColumnInfo {
            default: Some("nextval('users_id_seq'::regclass)".into()),
            ..info("integer", "int4")
        };
        assert!(serial.into_column(&connector, table, &enums).unwrap().auto_increment);

        let identity = ColumnInfo {
            is_identity: true,
            ..info("bigint", "int8")
        };
        assert!(identity.into_column(&connector, table, &enums).unwrap().auto_increment);
    }
}
