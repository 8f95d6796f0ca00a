use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use storefront_model::{ImageFilter, ImageId, ImagePatch, ProductId, ProductImage};
use tracing::debug;

use crate::{
    database::{
        infrastructure::postgres::advisory::AdvisoryProductLock,
        ports::images::{ProductImageRepository, StorageLock},
    },
    error::{CatalogError, Result},
};

const IMAGE_COLUMNS: &str =
    "id, product_id, image_url, display_order, is_primary, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct PostgresProductImageRepository {
    pool: PgPool,
}

impl PostgresProductImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn select_filtered<'a>(filter: &ImageFilter) -> QueryBuilder<'a, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {IMAGE_COLUMNS} FROM product_images WHERE TRUE"
        ));
        if let Some(product_id) = filter.product_id {
            qb.push(" AND product_id = ").push_bind(product_id);
        }
        if filter.position_is_null {
            qb.push(" AND display_order IS NULL");
        }
        if let Some(is_primary) = filter.is_primary {
            qb.push(" AND is_primary = ").push_bind(is_primary);
        }
        qb.push(" ORDER BY product_id, created_at, id");
        qb
    }

    async fn get_image(&self, id: ImageId) -> Result<ProductImage> {
        sqlx::query_as::<_, ProductImage>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM product_images WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error(e, &format!("product image {id}")))
    }
}

/// `RowNotFound` is the only sqlx error that says something about the data;
/// everything else means the backend could not serve the request.
pub(crate) fn storage_error(err: sqlx::Error, what: &str) -> CatalogError {
    match err {
        sqlx::Error::RowNotFound => CatalogError::NotFound(what.to_string()),
        other => CatalogError::StorageUnavailable(format!("{what}: {other}")),
    }
}

#[async_trait]
impl ProductImageRepository for PostgresProductImageRepository {
    async fn list_images(&self, filter: &ImageFilter) -> Result<Vec<ProductImage>> {
        let mut qb = Self::select_filtered(filter);
        let rows = qb
            .build_query_as::<ProductImage>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error(e, "list product images"))?;
        debug!(rows = rows.len(), ?filter, "listed product images");
        Ok(rows)
    }

    async fn update_image(
        &self,
        id: ImageId,
        patch: &ImagePatch,
    ) -> Result<ProductImage> {
        patch.validate()?;
        if patch.is_empty() {
            return self.get_image(id).await;
        }

        sqlx::query_as::<_, ProductImage>(&format!(
            r#"
            UPDATE product_images
            SET display_order = COALESCE($2, display_order),
                is_primary = COALESCE($3, is_primary),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {IMAGE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.position)
        .bind(patch.is_primary)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error(e, &format!("update product image {id}")))?
        .ok_or_else(|| CatalogError::NotFound(format!("product image {id}")))
    }

    async fn lock_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<Box<dyn StorageLock>>> {
        let lock = AdvisoryProductLock::acquire(&self.pool, product_id).await?;
        Ok(Some(Box::new(lock)))
    }
}
