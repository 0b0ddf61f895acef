//! Postgres reference dialect.
//!
//! - [`PostgresType`]: native type parsing and validation
//! - [`riskiness`]: the type-cast risk classifier
//! - [`PostgresConnector`]: the [`Connector`](crate::connector::Connector) implementation
//! - [`PostgresPlanner`]: renders migration steps as DDL

mod cast;
mod connector;
mod planner;
mod types;

pub use cast::riskiness;
pub use connector::{PostgresConnector, MAX_IDENTIFIER_LENGTH};
pub use planner::{quote_ident, quote_literal, render_default, PostgresPlanner};
pub use types::{PostgresType, MAX_LENGTH, MAX_NUMERIC_PRECISION, MAX_TIME_PRECISION};
