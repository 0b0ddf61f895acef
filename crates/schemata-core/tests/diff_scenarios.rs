//! End-to-end scenarios for the differ and the Postgres planner.

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use schemata_core::migration::{Differ, Migration, MigrationStep, Planner, TableChange};
use schemata_core::postgres::{PostgresConnector, PostgresPlanner};
use schemata_core::schema::{
    Column, ColumnId, ColumnType, Database, Enum, ForeignKey, Index, NativeType, ScalarType,
    Table, TableId,
};
use schemata_core::ColumnTypeChange;

fn diff(prev: &Database, next: &Database) -> Vec<MigrationStep> {
    Differ::new(&PostgresConnector).diff(prev, next).unwrap()
}

fn kinds(steps: &[MigrationStep]) -> Vec<&'static str> {
    steps.iter().map(MigrationStep::kind).collect()
}

/// `users(id PK)` and `posts(id PK, author_id -> users.id)` with an index on
/// `author_id`; the type of `author_id` is configurable.
fn blog(author_id: ColumnType) -> Database {
    let mut db = Database::new("public");
    let users = db.add_table(Table::new("users"));
    let user_id = db.add_column(Column::new(users, "id", ColumnType::scalar(ScalarType::Int)));
    db.add_index_on(Index::primary_key(users, "users_pkey"), [user_id]);

    let posts = db.add_table(Table::new("posts"));
    let post_id = db.add_column(Column::new(posts, "id", ColumnType::scalar(ScalarType::Int)));
    let author = db.add_column(Column::new(posts, "author_id", author_id));
    db.add_index_on(Index::primary_key(posts, "posts_pkey"), [post_id]);
    db.add_index_on(Index::new(posts, "posts_author_id_idx"), [author]);
    db.add_foreign_key_on(
        ForeignKey::new("posts_author_id_fkey", posts, users),
        [(author, user_id)],
    );
    db
}

#[test]
fn test_new_table_completeness() {
    let prev = Database::new("public");
    let next = blog(ColumnType::scalar(ScalarType::Int));
    let steps = diff(&prev, &next);

    let posts = next.find_table("posts").unwrap();
    let create_posts = steps
        .iter()
        .filter(|s| matches!(s, MigrationStep::CreateTable { table } if *table == posts.id))
        .count();
    assert_eq!(create_posts, 1);

    let fks: Vec<_> = steps
        .iter()
        .filter_map(|s| match s {
            MigrationStep::AddForeignKey { foreign_key } => Some(*foreign_key),
            _ => None,
        })
        .collect();
    assert_eq!(fks, posts.foreign_keys().map(|fk| fk.id).collect::<Vec<_>>());

    let indexes: Vec<_> = steps
        .iter()
        .filter_map(|s| match s {
            MigrationStep::CreateIndex { index } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(
        indexes,
        posts.secondary_indexes().map(|i| i.id).collect::<Vec<_>>()
    );

    assert!(!steps.iter().any(|s| matches!(
        s,
        MigrationStep::DropTable { .. } | MigrationStep::AlterTable { .. }
    )));
    assert_eq!(
        kinds(&steps),
        vec!["CreateTable", "CreateTable", "CreateIndex", "AddForeignKey"]
    );
}

#[test]
fn test_enum_variant_diff() {
    let mut prev = Database::new("public");
    prev.add_enum(Enum::new("letters", ["A", "B"]));
    let mut next = Database::new("public");
    next.add_enum(Enum::new("letters", ["B", "C"]));

    match diff(&prev, &next).as_slice() {
        [MigrationStep::AlterEnum {
            created_variants,
            dropped_variants,
            ..
        }] => {
            assert_eq!(created_variants, &vec!["C".to_string()]);
            assert_eq!(dropped_variants, &vec!["A".to_string()]);
        }
        other => panic!("expected a single AlterEnum, got {other:?}"),
    }
}

#[test]
fn test_foreign_key_invalidated_by_type_change() {
    let prev = blog(ColumnType::scalar(ScalarType::Int));
    let next = blog(ColumnType::native(NativeType::new("uuid")));
    let steps = diff(&prev, &next);

    assert_eq!(
        kinds(&steps),
        vec!["DropForeignKey", "AlterTable", "CreateIndex", "AddForeignKey"]
    );
    let alter = steps
        .iter()
        .find_map(|s| match s {
            MigrationStep::AlterTable { changes, .. } => Some(changes),
            _ => None,
        })
        .unwrap();
    match alter.as_slice() {
        [TableChange::DropAndRecreateColumn { changes, .. }] => {
            assert_eq!(changes.type_change(), ColumnTypeChange::NotCastable);
        }
        other => panic!("unexpected table changes {other:?}"),
    }
}

#[test]
fn test_safe_type_change_keeps_foreign_key() {
    let prev = blog(ColumnType::scalar(ScalarType::Int));
    let next = blog(ColumnType::scalar(ScalarType::BigInt));
    let steps = diff(&prev, &next);

    assert_eq!(kinds(&steps), vec!["AlterTable"]);
    match &steps[0] {
        MigrationStep::AlterTable { changes, .. } => match changes.as_slice() {
            [TableChange::AlterColumn { changes, .. }] => {
                assert_eq!(changes.type_change(), ColumnTypeChange::SafeCast);
            }
            other => panic!("unexpected table changes {other:?}"),
        },
        other => panic!("unexpected step {other:?}"),
    }
}

#[test]
fn test_ordering_drop_before_create() {
    let mut prev = blog(ColumnType::scalar(ScalarType::Int));
    let legacy = prev.add_table(Table::new("legacy"));
    prev.add_column(Column::new(legacy, "id", ColumnType::scalar(ScalarType::Int)));

    let mut next = blog(ColumnType::native(NativeType::new("uuid")));
    let audit = next.add_table(Table::new("audit"));
    next.add_column(Column::new(audit, "id", ColumnType::scalar(ScalarType::Int)));

    let steps = diff(&prev, &next);
    let position = |kind: &str| -> Vec<usize> {
        steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind() == kind)
            .map(|(i, _)| i)
            .collect()
    };

    let drops = position("DropTable");
    let creates = position("CreateTable");
    assert!(!drops.is_empty() && !creates.is_empty());
    assert!(drops.iter().all(|d| creates.iter().all(|c| d < c)));

    let drop_fks = position("DropForeignKey");
    let alters = position("AlterTable");
    assert!(!drop_fks.is_empty() && !alters.is_empty());
    assert!(drop_fks.iter().all(|d| alters.iter().all(|a| d < a)));
}

#[test]
fn test_arity_narrowing_end_to_end() {
    let prev = blog(ColumnType::scalar(ScalarType::Int));
    let next = blog(ColumnType::scalar(ScalarType::Int).nullable());
    let steps = diff(&prev, &next);

    let plan = PostgresPlanner::new()
        .plan(&Migration::new(&prev, &next, steps))
        .unwrap();
    assert_eq!(
        plan.to_string(),
        "-- Alter table posts\n\
         ALTER TABLE \"posts\"\n    ALTER COLUMN \"author_id\" DROP NOT NULL;\n"
    );
}

#[test]
fn test_snapshots_round_trip_through_json() {
    let next = blog(ColumnType::scalar(ScalarType::Int));
    let loaded = Database::from_json(&next.to_json().unwrap()).unwrap();
    assert_eq!(diff(&next, &loaded), Vec::<MigrationStep>::new());
}

fn arb_column_type() -> impl Strategy<Value = ColumnType> {
    let scalar = prop_oneof![
        Just(ScalarType::Int),
        Just(ScalarType::BigInt),
        Just(ScalarType::Float),
        Just(ScalarType::Decimal),
        Just(ScalarType::String),
        Just(ScalarType::Bool),
        Just(ScalarType::DateTime),
        Just(ScalarType::Bytes),
    ];
    (scalar, 0..3u8).prop_map(|(scalar, arity)| {
        let ty = ColumnType::scalar(scalar);
        match arity {
            0 => ty,
            1 => ty.nullable(),
            _ => ty.list(),
        }
    })
}

/// Random databases: tables `t0..tn` with columns `c0..cm`, a primary key on
/// `c0`, an index on `c1` when present, and a foreign key from every table to
/// `t0`.
fn arb_database() -> impl Strategy<Value = Database> {
    (
        prop::collection::vec(prop::collection::vec(arb_column_type(), 1..5), 0..5),
        any::<bool>(),
    )
        .prop_map(|(tables, with_enum)| {
            let mut db = Database::new("public");
            let mood = with_enum.then(|| db.add_enum(Enum::new("mood", ["happy", "sad"])));
            let mut root = None;
            for (i, columns) in tables.into_iter().enumerate() {
                let table = db.add_table(Table::new(format!("t{i}")));
                let ids: Vec<_> = columns
                    .into_iter()
                    .enumerate()
                    .map(|(j, ty)| db.add_column(Column::new(table, format!("c{j}"), ty)))
                    .collect();
                if let Some(mood) = mood {
                    db.add_column(Column::new(table, "mood", ColumnType::enum_type(mood)));
                }
                db.add_index_on(Index::primary_key(table, format!("t{i}_pkey")), [ids[0]]);
                if let Some(&second) = ids.get(1) {
                    db.add_index_on(Index::new(table, format!("t{i}_c1_idx")), [second]);
                }
                let root = *root.get_or_insert(ids[0]);
                if i > 0 {
                    let root_table = table_of(&db, root);
                    db.add_foreign_key_on(
                        ForeignKey::new(format!("t{i}_c0_fkey"), table, root_table),
                        [(ids[0], root)],
                    );
                }
            }
            db
        })
}

fn table_of(db: &Database, column: ColumnId) -> TableId {
    db.walk(column).table().id
}

proptest! {
    #[test]
    fn prop_diff_is_idempotent(db in arb_database()) {
        prop_assert_eq!(diff(&db, &db), Vec::<MigrationStep>::new());
    }

    #[test]
    fn prop_steps_are_sorted(prev in arb_database(), next in arb_database()) {
        let steps = diff(&prev, &next);
        prop_assert!(steps.windows(2).all(|w| w[0].sort_key() <= w[1].sort_key()));

        let plan = PostgresPlanner::new().plan(&Migration::new(&prev, &next, steps.clone()));
        prop_assert!(plan.is_ok());
        prop_assert_eq!(plan.unwrap().statements.len(), steps.len());
    }
}
