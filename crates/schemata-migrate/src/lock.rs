//! Per-schema migration lock.
//!
//! At most one migration runs against a schema at a time. The lock is a
//! session-level Postgres advisory lock whose key is derived from the schema
//! name, held on a dedicated pooled connection for the lifetime of the guard.

use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use tokio::time::Instant;

use crate::config::LockMode;
use crate::error::{MigrateError, Result};

/// Interval between attempts when waiting with a timeout.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Advisory lock key for a schema: the first 8 bytes of its blake3 hash.
pub fn lock_key(schema: &str) -> i64 {
    let hash = blake3::hash(schema.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    i64::from_be_bytes(prefix)
}

/// A held migration lock.
///
/// Call [`release`](MigrationLock::release) when done. A guard dropped
/// without release closes its connection instead of returning it to the pool,
/// which ends the session and frees the lock server-side.
pub struct MigrationLock {
    conn: Option<PoolConnection<Postgres>>,
    schema: String,
    key: i64,
}

impl MigrationLock {
    /// Acquire the lock for `schema` in the given mode.
    pub async fn acquire(pool: &PgPool, schema: &str, mode: LockMode) -> Result<Self> {
        let key = lock_key(schema);
        let mut conn = pool.acquire().await?;

        tracing::debug!(schema, key, ?mode, "acquiring migration lock");
        match mode {
            LockMode::NoWait => {
                if !try_lock(&mut conn, key).await? {
                    return Err(MigrateError::LockHeld {
                        schema: schema.to_string(),
                    });
                }
            }
            LockMode::Timeout(timeout) => {
                let deadline = Instant::now() + timeout;
                while !try_lock(&mut conn, key).await? {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(MigrateError::LockTimeout {
                            schema: schema.to_string(),
                            timeout,
                        });
                    }
                    tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
                }
            }
            LockMode::Wait => {
                sqlx::query("SELECT pg_advisory_lock($1)")
                    .bind(key)
                    .execute(&mut *conn)
                    .await?;
            }
        }
        tracing::info!(schema, "migration lock acquired");

        Ok(Self {
            conn: Some(conn),
            schema: schema.to_string(),
            key,
        })
    }

    /// The locked schema.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Unlock and return the connection to the pool.
    pub async fn release(mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        let unlocked = sqlx::query_scalar::<_, bool>("SELECT pg_advisory_unlock($1)")
            .bind(self.key)
            .fetch_one(&mut *conn)
            .await;
        match unlocked {
            Ok(true) => {
                tracing::info!(schema = %self.schema, "migration lock released");
                Ok(())
            }
            Ok(false) => {
                tracing::warn!(schema = %self.schema, "migration lock was not held at release");
                Ok(())
            }
            Err(e) => {
                conn.close_on_drop();
                Err(e.into())
            }
        }
    }
}

impl Drop for MigrationLock {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            tracing::warn!(
                schema = %self.schema,
                "migration lock dropped without release, closing its connection"
            );
            conn.close_on_drop();
        }
    }
}

async fn try_lock(conn: &mut PoolConnection<Postgres>, key: i64) -> Result<bool> {
    let acquired = sqlx::query_scalar::<_, bool>("SELECT pg_try_advisory_lock($1)")
        .bind(key)
        .fetch_one(&mut **conn)
        .await?;
    Ok(acquired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lock_key_is_stable() {
        assert_eq!(lock_key("public"), lock_key("public"));

        let hash = blake3::hash(b"public");
        let expected = i64::from_be_bytes(hash.as_bytes()[..8].try_into().unwrap());
        assert_eq!(lock_key("public"), expected);
    }

    #[test]
    fn test_lock_key_differs_per_schema() {
        assert_ne!(lock_key("public"), lock_key("tenant_a"));
        assert_ne!(lock_key("tenant_a"), lock_key("tenant_b"));
    }
}
