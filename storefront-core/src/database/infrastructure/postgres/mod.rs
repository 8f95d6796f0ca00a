pub mod advisory;
pub mod images;
pub mod legacy;

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{fmt, time::Duration};
use tracing::info;

use crate::error::{CatalogError, Result};

use self::{images::PostgresProductImageRepository, legacy::LegacyOrderColumns};

pub const MIN_CONNECTIONS: u32 = 2;

/// Connection handle for the hosted catalog database.
///
/// Constructed explicitly from configuration and handed to whatever needs
/// storage; nothing in the crate reaches for a process-wide client.
#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
    max_connections: u32,
}

impl fmt::Debug for PostgresDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresDatabase")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl PostgresDatabase {
    /// A repair holds one connection for its advisory lock and needs another
    /// for queries, so the pool never shrinks below two.
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self> {
        let max_connections = max_connections.max(MIN_CONNECTIONS);
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(connection_string)
            .await
            .map_err(|e| {
                CatalogError::StorageUnavailable(format!(
                    "Database connection failed: {}",
                    e
                ))
            })?;

        info!(max_connections, "Database pool initialized");

        Ok(Self::from_pool_with_limit(pool, max_connections))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        let max_connections = pool.options().get_max_connections();
        Self::from_pool_with_limit(pool, max_connections)
    }

    fn from_pool_with_limit(pool: PgPool, max_connections: u32) -> Self {
        Self {
            pool,
            max_connections,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        crate::MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| CatalogError::Migration(e.to_string()))?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn images(&self) -> PostgresProductImageRepository {
        PostgresProductImageRepository::new(self.pool.clone())
    }

    pub async fn legacy_order_columns(&self) -> Result<LegacyOrderColumns> {
        LegacyOrderColumns::detect(&self.pool).await
    }
}
