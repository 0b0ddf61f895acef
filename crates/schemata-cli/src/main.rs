//! Schemata Command-Line Tool
//!
//! Describes live Postgres schemas and plans or applies migrations towards
//! JSON schema snapshots.

mod args;

use std::error::Error;
use std::path::Path;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use args::{lock_mode, Args, Command, OutputFormat};
use schemata_core::migration::MigrationPlan;
use schemata_core::Database;
use schemata_migrate::{plan_migration, Migrator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr so plans and snapshots on stdout can be piped.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schemata=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    run(args.command).await
}

async fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Describe { connection } => {
            let migrator = Migrator::connect(connection.into_config()).await?;
            let database = migrator.describe().await?;
            migrator.close().await;
            println!("{}", database.to_json()?);
        }

        Command::Diff { prev, next, format } => {
            let prev = load_schema(&prev)?;
            let next = load_schema(&next)?;
            print_plan(&plan_migration(&prev, &next)?, format)?;
        }

        Command::Plan {
            target,
            connection,
            format,
        } => {
            let target = load_schema(&target)?;
            let migrator = Migrator::connect(connection.into_config()).await?;
            let plan = migrator.plan(&target).await?;
            migrator.close().await;
            print_plan(&plan, format)?;
        }

        Command::Apply {
            target,
            connection,
            no_wait,
            lock_timeout,
            dry_run,
        } => {
            let target = load_schema(&target)?;
            let config = connection
                .into_config()
                .with_lock_mode(lock_mode(no_wait, lock_timeout))
                .with_dry_run(dry_run);
            let migrator = Migrator::connect(config).await?;
            let result = migrator.migrate(&target).await;
            migrator.close().await;
            let plan = result?;
            if dry_run {
                print_plan(&plan, OutputFormat::Sql)?;
            } else {
                tracing::info!(statements = plan.statements.len(), "migration complete");
            }
        }
    }
    Ok(())
}

fn load_schema(path: &Path) -> Result<Database, Box<dyn Error>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    Ok(Database::from_json(&json)?)
}

fn print_plan(plan: &MigrationPlan, format: OutputFormat) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Sql if plan.is_empty() => println!("-- No changes"),
        OutputFormat::Sql => print!("{plan}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(plan)?),
    }
    Ok(())
}
