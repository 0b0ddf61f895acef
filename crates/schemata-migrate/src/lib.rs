//! Schemata Migrate - live Postgres side of the migration pipeline.
//!
//! Introspects a running database into a [`schemata_core::Database`], diffs
//! it against a target, and applies the resulting plan under a per-schema
//! advisory lock.
//!
//! # Example
//!
//! ```ignore
//! use schemata_migrate::{LockMode, Migrator, MigratorConfig};
//!
//! let config = MigratorConfig::new("postgres://localhost/app")
//!     .with_lock_mode(LockMode::NoWait);
//! let migrator = Migrator::connect(config).await?;
//! let plan = migrator.migrate(&target).await?;
//! println!("{plan}");
//! ```

pub mod config;
pub mod describer;
pub mod error;
pub mod lock;
pub mod migrator;

pub use config::{LockMode, MigratorConfig, DEFAULT_SCHEMA};
pub use describer::Describer;
pub use error::{MigrateError, Result};
pub use lock::{lock_key, MigrationLock};
pub use migrator::{plan_migration, Migrator};
