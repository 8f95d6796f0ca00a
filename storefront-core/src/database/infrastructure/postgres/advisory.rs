//! Session-level advisory locks keyed on the product id.
//!
//! The lock lives on a dedicated pooled connection for as long as it is
//! held. Other `storefrontctl` runs against the same database wait on the
//! same key, which the in-process `ProductLocks` cannot see.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, pool::PoolConnection};
use storefront_model::ProductId;
use tracing::{debug, warn};

use crate::{
    database::{
        infrastructure::postgres::images::storage_error, ports::images::StorageLock,
    },
    error::Result,
};

#[derive(Debug)]
pub struct AdvisoryProductLock {
    conn: Option<PoolConnection<Postgres>>,
    product_id: ProductId,
}

impl AdvisoryProductLock {
    /// Wait for `pg_advisory_lock(product_id)` on a connection of its own.
    pub async fn acquire(pool: &PgPool, product_id: ProductId) -> Result<Self> {
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| storage_error(e, "acquire advisory lock connection"))?;
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(product_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| storage_error(e, &format!("advisory lock for product {product_id}")))?;
        debug!(%product_id, "advisory lock acquired");
        Ok(Self {
            conn: Some(conn),
            product_id,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }
}

#[async_trait]
impl StorageLock for AdvisoryProductLock {
    async fn release(mut self: Box<Self>) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        let product_id = self.product_id;
        let unlocked = sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(product_id)
            .execute(&mut *conn)
            .await;
        if let Err(err) = unlocked {
            // The session still owns the lock; closing it is the only way out.
            conn.close_on_drop();
            return Err(storage_error(
                err,
                &format!("advisory unlock for product {product_id}"),
            ));
        }
        Ok(())
    }
}

impl Drop for AdvisoryProductLock {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.as_mut() {
            warn!(
                product_id = %self.product_id,
                "advisory lock dropped without release; closing its connection"
            );
            conn.close_on_drop();
        }
    }
}
