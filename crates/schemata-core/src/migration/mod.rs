//! Schema migration: diffing and plan types.
//!
//! The [`Differ`] compares two [`Database`](crate::schema::Database)
//! snapshots and emits sorted [`MigrationStep`]s. A dialect [`Planner`] then
//! renders those steps into a [`MigrationPlan`] of executable statements.
//!
//! # Step order
//!
//! Steps are sorted by kind, then by the ID of the entity they touch:
//!
//! | Order | Step | Runs before |
//! |-------|------|-------------|
//! | 0-2 | extensions | anything that may use their types |
//! | 3-4 | create/alter enum | tables whose columns use them |
//! | 5-6 | drop foreign key/index | the columns they cover change |
//! | 7-8 | alter/drop table | enums are dropped |
//! | 9 | drop enum | a new table may reuse the name |
//! | 10-11 | create table/index | foreign keys relying on them |
//! | 12-14 | rename/add foreign key, rename index | |
//!
//! # Example
//!
//! ```ignore
//! use schemata_core::migration::{Differ, Migration, Planner};
//! use schemata_core::postgres::{PostgresConnector, PostgresPlanner};
//!
//! let steps = Differ::new(&PostgresConnector).diff(&live, &target)?;
//! let plan = PostgresPlanner::new().plan(&Migration::new(&live, &target, steps))?;
//! println!("{plan}");
//! ```

pub mod differ;
pub mod error;
pub mod plan;
pub mod steps;

pub use differ::Differ;
pub use error::MigrationError;
pub use plan::{Migration, MigrationPlan, Planner, Statement, Step};
pub use steps::{ColumnChanges, ExtensionChanges, MigrationStep, TableChange};
