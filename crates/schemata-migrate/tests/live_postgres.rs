//! Tests against a running Postgres.
//!
//! Each test creates its own schema and drops it afterwards. They are skipped
//! when `DATABASE_URL` is not set.

use pretty_assertions::assert_eq;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use schemata_core::migration::{MigrationPlan, Statement, Step};
use schemata_core::schema::{
    Column, ColumnType, DefaultValue, Enum, ForeignKey, ForeignKeyAction, Index, NativeType,
    ScalarType, Table,
};
use schemata_core::Database;
use schemata_migrate::{
    plan_migration, LockMode, MigrateError, MigrationLock, Migrator, MigratorConfig,
};

struct TestSchema {
    url: String,
    name: String,
    admin: PgPool,
}

impl TestSchema {
    async fn create(suffix: &str) -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let admin = PgPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .unwrap();
        let name = format!("schemata_test_{}_{suffix}", std::process::id());
        let reset = format!("DROP SCHEMA IF EXISTS \"{name}\" CASCADE; CREATE SCHEMA \"{name}\"");
        sqlx::raw_sql(&reset).execute(&admin).await.unwrap();
        Some(Self { url, name, admin })
    }

    fn config(&self) -> MigratorConfig {
        MigratorConfig::new(&self.url).with_schema(&self.name)
    }

    async fn teardown(self) {
        sqlx::raw_sql(&format!("DROP SCHEMA \"{}\" CASCADE", self.name))
            .execute(&self.admin)
            .await
            .unwrap();
        self.admin.close().await;
    }
}

fn target(schema: &str) -> Database {
    let mut db = Database::new(schema);
    let mood = db.add_enum(Enum::new("mood", ["happy", "sad"]));

    let users = db.add_table(Table::new("users"));
    let user_id = db.add_column(
        Column::new(users, "id", ColumnType::scalar(ScalarType::Int)).auto_increment(),
    );
    let email = db.add_column(Column::new(
        users,
        "email",
        ColumnType::native(NativeType::with_args("varchar", vec![255])),
    ));
    db.add_column(
        Column::new(users, "mood", ColumnType::enum_type(mood))
            .with_default(DefaultValue::String("happy".into())),
    );
    db.add_column(Column::new(
        users,
        "nickname",
        ColumnType::scalar(ScalarType::String).nullable(),
    ));
    db.add_index_on(Index::primary_key(users, "users_pkey"), [user_id]);
    db.add_index_on(Index::unique(users, "users_email_key"), [email]);

    let posts = db.add_table(Table::new("posts"));
    let post_id = db.add_column(Column::new(posts, "id", ColumnType::scalar(ScalarType::Int)));
    let author = db.add_column(Column::new(
        posts,
        "author_id",
        ColumnType::scalar(ScalarType::Int),
    ));
    db.add_index_on(Index::primary_key(posts, "posts_pkey"), [post_id]);
    db.add_index_on(Index::new(posts, "posts_author_id_idx"), [author]);
    db.add_foreign_key_on(
        ForeignKey::new("posts_author_id_fkey", posts, users)
            .on_delete(ForeignKeyAction::Cascade),
        [(author, user_id)],
    );
    db
}

#[tokio::test]
async fn test_migrate_converges() {
    let Some(schema) = TestSchema::create("converge").await else {
        return;
    };
    let target = target(&schema.name);
    let migrator = Migrator::connect(schema.config()).await.unwrap();

    let plan = migrator.migrate(&target).await.unwrap();
    assert!(!plan.is_empty());

    let live = migrator.describe().await.unwrap();
    assert_eq!(live.table_names(), vec!["posts", "users"]);
    assert_eq!(plan_migration(&live, &target).unwrap(), MigrationPlan::new());

    // A second run has nothing to do.
    assert!(migrator.migrate(&target).await.unwrap().is_empty());

    migrator.close().await;
    schema.teardown().await;
}

#[tokio::test]
async fn test_dry_run_leaves_schema_untouched() {
    let Some(schema) = TestSchema::create("dry_run").await else {
        return;
    };
    let migrator = Migrator::connect(schema.config().with_dry_run(true))
        .await
        .unwrap();

    let plan = migrator.migrate(&target(&schema.name)).await.unwrap();
    assert!(!plan.is_empty());
    assert!(migrator.describe().await.unwrap().is_empty());

    migrator.close().await;
    schema.teardown().await;
}

#[tokio::test]
async fn test_lock_is_exclusive() {
    let Some(schema) = TestSchema::create("lock").await else {
        return;
    };

    let held = MigrationLock::acquire(&schema.admin, &schema.name, LockMode::NoWait)
        .await
        .unwrap();
    let second = MigrationLock::acquire(&schema.admin, &schema.name, LockMode::NoWait).await;
    assert!(matches!(second, Err(MigrateError::LockHeld { .. })));

    let timed = MigrationLock::acquire(
        &schema.admin,
        &schema.name,
        LockMode::Timeout(std::time::Duration::from_millis(300)),
    )
    .await;
    assert!(matches!(timed, Err(MigrateError::LockTimeout { .. })));

    held.release().await.unwrap();
    let again = MigrationLock::acquire(&schema.admin, &schema.name, LockMode::NoWait)
        .await
        .unwrap();
    again.release().await.unwrap();

    schema.teardown().await;
}

#[tokio::test]
async fn test_failed_step_is_annotated() {
    let Some(schema) = TestSchema::create("failure").await else {
        return;
    };
    let migrator = Migrator::connect(schema.config()).await.unwrap();

    let mut plan = MigrationPlan::new();
    plan.push(
        Statement::new("Create table a").with_step(Step::new("CREATE TABLE \"a\" (x int)")),
    );
    plan.push(
        Statement::new("Broken").with_step(
            Step::new("ALTER TABLE \"missing\" ADD COLUMN y int").with_comment("Add column y"),
        ),
    );

    match migrator.apply_migration(&plan).await {
        Err(MigrateError::StepFailed { comment, .. }) => assert_eq!(comment, "Add column y"),
        other => panic!("expected StepFailed, got {other:?}"),
    }
    // Earlier statements stay applied.
    assert_eq!(migrator.describe().await.unwrap().table_names(), vec!["a"]);

    migrator.close().await;
    schema.teardown().await;
}
