//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use schemata_migrate::config::DEFAULT_MAX_CONNECTIONS;
use schemata_migrate::{LockMode, MigratorConfig, DEFAULT_SCHEMA};

/// Postgres schema diff and migration tool.
#[derive(Parser, Debug)]
#[command(name = "schemata")]
#[command(version, about = "Postgres schema diff and migration tool", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the live schema as JSON.
    Describe {
        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Plan the migration between two schema snapshots, offline.
    Diff {
        /// Snapshot of the current schema.
        prev: PathBuf,
        /// Snapshot of the target schema.
        next: PathBuf,
        /// Output format.
        #[arg(long, default_value = "sql", value_enum)]
        format: OutputFormat,
    },

    /// Plan the migration from the live schema to a target snapshot.
    Plan {
        /// Snapshot of the target schema.
        target: PathBuf,
        #[command(flatten)]
        connection: ConnectionArgs,
        /// Output format.
        #[arg(long, default_value = "sql", value_enum)]
        format: OutputFormat,
    },

    /// Migrate the live schema to a target snapshot.
    Apply {
        /// Snapshot of the target schema.
        target: PathBuf,
        #[command(flatten)]
        connection: ConnectionArgs,
        /// Fail immediately if another migration holds the lock.
        #[arg(long, conflicts_with = "lock_timeout")]
        no_wait: bool,
        /// Give up waiting for the lock after this many seconds.
        #[arg(long)]
        lock_timeout: Option<u64>,
        /// Print the plan without executing it.
        #[arg(long)]
        dry_run: bool,
    },
}

/// Database connection options.
#[derive(clap::Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Postgres connection URL.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Schema to describe or migrate.
    #[arg(long, default_value = DEFAULT_SCHEMA)]
    pub schema: String,

    /// Maximum pooled connections.
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,
}

impl ConnectionArgs {
    /// Convert connection arguments to migrator configuration.
    pub fn into_config(self) -> MigratorConfig {
        MigratorConfig::new(self.database_url)
            .with_schema(self.schema)
            .with_max_connections(self.max_connections)
    }
}

/// Lock mode selected by `--no-wait` / `--lock-timeout`.
pub fn lock_mode(no_wait: bool, lock_timeout: Option<u64>) -> LockMode {
    match (no_wait, lock_timeout) {
        (true, _) => LockMode::NoWait,
        (false, Some(secs)) => LockMode::Timeout(Duration::from_secs(secs)),
        (false, None) => LockMode::Wait,
    }
}

/// How plans are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// SQL script
    Sql,
    /// JSON document
    Json,
}
