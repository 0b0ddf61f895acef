//! Migration orchestration against a live database.

use schemata_core::migration::{Differ, Migration, MigrationPlan, Planner};
use schemata_core::{Database, PostgresConnector, PostgresPlanner};
use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::config::MigratorConfig;
use crate::describer::Describer;
use crate::error::{MigrateError, Result};
use crate::lock::MigrationLock;

/// Compute the Postgres plan that turns `live` into `target`.
pub fn plan_migration(live: &Database, target: &Database) -> Result<MigrationPlan> {
    let steps = Differ::new(&PostgresConnector).diff(live, target)?;
    let plan = PostgresPlanner::new().plan(&Migration::new(live, target, steps))?;
    Ok(plan)
}

/// Describes, diffs, plans and applies migrations for one schema.
pub struct Migrator {
    pool: PgPool,
    config: MigratorConfig,
}

impl Migrator {
    /// Connect using the configured URL.
    ///
    /// Every pooled session gets `search_path` set to the configured schema,
    /// since rendered statements use unqualified names.
    pub async fn connect(config: MigratorConfig) -> Result<Self> {
        let options = PgConnectOptions::from_str(&config.database_url)?
            .options([("search_path", config.schema.as_str())]);
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        tracing::info!(schema = %config.schema, "connected to database");
        Ok(Self { pool, config })
    }

    /// The active configuration.
    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// Introspect the configured schema.
    pub async fn describe(&self) -> Result<Database> {
        Describer::new(&self.pool).describe(&self.config.schema).await
    }

    /// Plan the migration from the live schema to `target`.
    pub async fn plan(&self, target: &Database) -> Result<MigrationPlan> {
        let live = self.describe().await?;
        plan_migration(&live, target)
    }

    /// Execute every step of `plan` in order on a single connection.
    ///
    /// Stops at the first failure; statements that already ran stay applied.
    pub async fn apply_migration(&self, plan: &MigrationPlan) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        for statement in &plan.statements {
            tracing::info!(comment = %statement.comment, "applying statement");
            for step in &statement.steps {
                let result = if step.args.is_empty() {
                    sqlx::raw_sql(&step.cmd).execute(&mut *conn).await
                } else {
                    let mut query = sqlx::query(&step.cmd);
                    for arg in &step.args {
                        query = query.bind(arg.as_str());
                    }
                    query.execute(&mut *conn).await
                };

                if let Err(source) = result {
                    let comment = if step.comment.is_empty() {
                        statement.comment.clone()
                    } else {
                        step.comment.clone()
                    };
                    tracing::warn!(%comment, error = %source, "migration step failed");
                    // The session may be left inside an open transaction.
                    conn.close_on_drop();
                    return Err(MigrateError::StepFailed { comment, source });
                }
            }
        }

        tracing::info!(
            statements = plan.statements.len(),
            steps = plan.step_count(),
            "migration applied"
        );
        Ok(())
    }

    /// Bring the live schema to `target` under the migration lock.
    ///
    /// In dry-run mode the plan is logged and returned without being
    /// executed, and no lock is taken.
    pub async fn migrate(&self, target: &Database) -> Result<MigrationPlan> {
        if self.config.dry_run {
            let plan = self.plan(target).await?;
            for statement in &plan.statements {
                tracing::info!(comment = %statement.comment, "dry run: would apply statement");
            }
            return Ok(plan);
        }

        let lock =
            MigrationLock::acquire(&self.pool, &self.config.schema, self.config.lock_mode).await?;
        let result = self.migrate_locked(target).await;
        let released = lock.release().await;
        let plan = result?;
        released?;
        Ok(plan)
    }

    async fn migrate_locked(&self, target: &Database) -> Result<MigrationPlan> {
        let plan = self.plan(target).await?;
        if plan.is_empty() {
            tracing::info!(schema = %self.config.schema, "schema is up to date");
            return Ok(plan);
        }
        self.apply_migration(&plan).await?;
        Ok(plan)
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schemata_core::schema::{Column, ColumnType, Index, ScalarType, Table};

    fn users() -> Database {
        let mut db = Database::new("public");
        let users = db.add_table(Table::new("users"));
        let id = db.add_column(Column::new(users, "id", ColumnType::scalar(ScalarType::Int)));
        db.add_index_on(Index::primary_key(users, "users_pkey"), [id]);
        db
    }

    #[test]
    fn test_plan_migration_up_to_date() {
        let plan = plan_migration(&users(), &users()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_migration_creates_table() {
        let plan = plan_migration(&Database::new("public"), &users()).unwrap();
        assert_eq!(plan.statements.len(), 1);
        assert_eq!(plan.statements[0].comment, "Create table users");
        assert!(plan.steps().next().unwrap().cmd.starts_with("CREATE TABLE \"users\""));
    }

    #[test]
    fn test_plan_migration_rejects_invalid_target() {
        let mut target = users();
        let users = target.find_table("users").unwrap().id;
        target.add_table(Table::new("users"));
        target.add_index(Index::primary_key(users, "second_pkey"));
        assert!(matches!(
            plan_migration(&Database::new("public"), &target),
            Err(MigrateError::Core(_))
        ));
    }
}
