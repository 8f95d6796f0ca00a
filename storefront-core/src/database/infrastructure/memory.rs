use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use storefront_model::{ImageFilter, ImageId, ImagePatch, ProductId, ProductImage};
use tokio::sync::RwLock;

use crate::{
    database::ports::images::{ProductImageRepository, StorageLock},
    error::{CatalogError, Result},
};

/// Process-local image table.
///
/// Backs the unit and property tests and lets callers rehearse a repair
/// against a snapshot. Failures can be injected per product, for catalog-wide
/// scans, or after a number of writes, to exercise the failure paths of the
/// ordering service.
#[derive(Debug, Default)]
pub struct InMemoryProductImageRepository {
    rows: RwLock<Vec<ProductImage>>,
    failing_reads: RwLock<HashSet<ProductId>>,
    failing_writes: RwLock<HashSet<ProductId>>,
    failing_scans: AtomicBool,
    write_budget: RwLock<Option<usize>>,
    writes: AtomicUsize,
    locks_taken: AtomicUsize,
    locks_released: Arc<AtomicUsize>,
}

impl InMemoryProductImageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images(images: impl IntoIterator<Item = ProductImage>) -> Self {
        Self {
            rows: RwLock::new(images.into_iter().collect()),
            ..Self::default()
        }
    }

    pub async fn snapshot(&self) -> Vec<ProductImage> {
        self.rows.read().await.clone()
    }

    pub async fn get(&self, id: ImageId) -> Option<ProductImage> {
        self.rows.read().await.iter().find(|row| row.id == id).cloned()
    }

    /// Every read touching `product_id` fails with `StorageUnavailable`.
    pub async fn fail_reads_for(&self, product_id: ProductId) {
        self.failing_reads.write().await.insert(product_id);
    }

    /// Reads not scoped to a single product fail with `StorageUnavailable`.
    pub fn fail_catalog_scans(&self) {
        self.failing_scans.store(true, Ordering::SeqCst);
    }

    /// Every update of a row owned by `product_id` fails with
    /// `StorageUnavailable`.
    pub async fn fail_writes_for(&self, product_id: ProductId) {
        self.failing_writes.write().await.insert(product_id);
    }

    /// Let `remaining` more updates succeed, then fail every later one.
    pub async fn fail_writes_after(&self, remaining: usize) {
        *self.write_budget.write().await = Some(remaining);
    }

    pub async fn heal(&self) {
        self.failing_reads.write().await.clear();
        self.failing_writes.write().await.clear();
        self.failing_scans.store(false, Ordering::SeqCst);
        *self.write_budget.write().await = None;
    }

    /// Number of successful `update_image` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Storage locks granted and not yet released.
    pub fn storage_locks_held(&self) -> usize {
        self.locks_taken
            .load(Ordering::SeqCst)
            .saturating_sub(self.locks_released.load(Ordering::SeqCst))
    }

    pub fn storage_locks_taken(&self) -> usize {
        self.locks_taken.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct CountedLock {
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl StorageLock for CountedLock {
    async fn release(self: Box<Self>) -> Result<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ProductImageRepository for InMemoryProductImageRepository {
    async fn list_images(&self, filter: &ImageFilter) -> Result<Vec<ProductImage>> {
        if let Some(product_id) = filter.product_id
            && self.failing_reads.read().await.contains(&product_id)
        {
            return Err(CatalogError::StorageUnavailable(format!(
                "injected read failure for product {product_id}"
            )));
        }
        if filter.product_id.is_none() && self.failing_scans.load(Ordering::SeqCst) {
            return Err(CatalogError::StorageUnavailable(
                "injected catalog scan failure".to_string(),
            ));
        }

        let mut rows: Vec<ProductImage> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.product_id
                .cmp(&b.product_id)
                .then_with(|| a.upload_order(b))
        });
        Ok(rows)
    }

    async fn update_image(
        &self,
        id: ImageId,
        patch: &ImagePatch,
    ) -> Result<ProductImage> {
        patch.validate()?;
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| CatalogError::NotFound(format!("product image {id}")))?;

        if self.failing_writes.read().await.contains(&row.product_id) {
            return Err(CatalogError::StorageUnavailable(format!(
                "injected write failure for product {}",
                row.product_id
            )));
        }

        let mut budget = self.write_budget.write().await;
        match budget.as_mut() {
            Some(0) => {
                return Err(CatalogError::StorageUnavailable(format!(
                    "injected write failure updating image {id}"
                )));
            }
            Some(remaining) => *remaining -= 1,
            None => {}
        }

        patch.apply_to(row, Utc::now());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(row.clone())
    }

    async fn lock_product(
        &self,
        _product_id: ProductId,
    ) -> Result<Option<Box<dyn StorageLock>>> {
        self.locks_taken.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Box::new(CountedLock {
            released: Arc::clone(&self.locks_released),
        })))
    }
}
