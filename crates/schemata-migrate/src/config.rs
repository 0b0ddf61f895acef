//! Migrator configuration.

use std::time::Duration;

/// Default schema migrations run against.
pub const DEFAULT_SCHEMA: &str = "public";

/// Default size of the connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 2;

/// How to acquire the migration lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// Try once and fail if another migration holds the lock.
    NoWait,
    /// Retry until the timeout elapses.
    Timeout(Duration),
    /// Block until the lock is acquired.
    #[default]
    Wait,
}

/// Migrator configuration.
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Postgres connection URL.
    pub database_url: String,

    /// Schema to introspect and migrate.
    pub schema: String,

    /// Lock acquisition mode used by `migrate`.
    pub lock_mode: LockMode,

    /// Maximum connections in the pool. The lock holds one for the whole run.
    pub max_connections: u32,

    /// Log the plan instead of executing it.
    pub dry_run: bool,
}

impl MigratorConfig {
    /// Create a configuration for the given connection URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            schema: DEFAULT_SCHEMA.to_string(),
            lock_mode: LockMode::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            dry_run: false,
        }
    }

    /// Set the schema name.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Set the lock acquisition mode.
    pub fn with_lock_mode(mut self, mode: LockMode) -> Self {
        self.lock_mode = mode;
        self
    }

    /// Set the pool size. At least two connections are kept so the applier
    /// can run while the lock connection is held.
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(DEFAULT_MAX_CONNECTIONS);
        self
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self::new("postgres://localhost/postgres")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = MigratorConfig::default();
        assert_eq!(config.schema, DEFAULT_SCHEMA);
        assert_eq!(config.lock_mode, LockMode::Wait);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_config_builder() {
        let config = MigratorConfig::new("postgres://db/app")
            .with_schema("tenant_a")
            .with_lock_mode(LockMode::Timeout(Duration::from_secs(5)))
            .with_max_connections(8)
            .with_dry_run(true);

        assert_eq!(config.database_url, "postgres://db/app");
        assert_eq!(config.schema, "tenant_a");
        assert_eq!(config.lock_mode, LockMode::Timeout(Duration::from_secs(5)));
        assert_eq!(config.max_connections, 8);
        assert!(config.dry_run);
    }

    #[test]
    fn test_pool_keeps_room_for_lock() {
        let config = MigratorConfig::default().with_max_connections(1);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }
}
