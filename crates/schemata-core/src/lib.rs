//! Schemata Core - schema model, diff engine, and migration planning.
//!
//! This crate is pure: it compares two [`Database`] snapshots and renders the
//! difference as DDL, without touching a live database.

pub mod connector;
pub mod error;
pub mod migration;
pub mod postgres;
pub mod schema;

pub use connector::{ColumnTypeChange, Connector};
pub use error::{Error, Result};
pub use migration::{
    ColumnChanges, Differ, Migration, MigrationError, MigrationPlan, MigrationStep, Planner,
    Statement, Step, TableChange,
};
pub use postgres::{PostgresConnector, PostgresPlanner};
pub use schema::{Database, Pair};
