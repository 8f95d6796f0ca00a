use async_trait::async_trait;
use storefront_model::{ImageFilter, ImageId, ImagePatch, ProductId, ProductImage};

use crate::error::Result;

/// Storage-side hold on one product's gallery.
///
/// Dropping a lock without calling [`StorageLock::release`] must still free
/// it eventually; release is the prompt path.
#[async_trait]
pub trait StorageLock: Send {
    async fn release(self: Box<Self>) -> Result<()>;
}

/// Repository port for product image rows.
///
/// The ordering service only ever reads rows and patches `display_order` /
/// `is_primary` on existing ones; creation and deletion belong to the upload
/// and admin workflows, so the port does not expose them.
#[async_trait]
pub trait ProductImageRepository: Send + Sync {
    /// Rows matching `filter`, ordered by `(product_id, created_at, id)`.
    async fn list_images(&self, filter: &ImageFilter) -> Result<Vec<ProductImage>>;

    /// Patch a single row and return it as stored. Fails with
    /// [`CatalogError::NotFound`](crate::error::CatalogError::NotFound) when
    /// the id no longer exists.
    async fn update_image(
        &self,
        id: ImageId,
        patch: &ImagePatch,
    ) -> Result<ProductImage>;

    /// Exclusion on `product_id` shared with other processes using the same
    /// storage. Blocks until granted. `None` when the backend has no such
    /// primitive.
    async fn lock_product(
        &self,
        _product_id: ProductId,
    ) -> Result<Option<Box<dyn StorageLock>>> {
        Ok(None)
    }

    async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>> {
        self.list_images(&ImageFilter::for_product(product_id)).await
    }

    async fn list_all(&self) -> Result<Vec<ProductImage>> {
        self.list_images(&ImageFilter::all()).await
    }
}
