use std::sync::Arc;

use dashmap::DashMap;
use storefront_model::ProductId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-product mutual exclusion.
///
/// Storage offers no atomic "swap the primary" primitive, so the clear-then-set
/// sequence is only safe while nobody else writes the same product. Products
/// never share a lock, so independent repairs proceed in parallel.
#[derive(Debug, Default)]
pub struct ProductLocks {
    products: DashMap<ProductId, Arc<Mutex<()>>>,
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `product_id`. The guard releases on drop.
    pub async fn lock(&self, product_id: ProductId) -> OwnedMutexGuard<()> {
        let entry = self
            .products
            .entry(product_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        entry.lock_owned().await
    }

    /// Drop the entry for `product_id` once nobody holds or waits on it, so
    /// the map only tracks products that are in flight.
    pub fn release_idle(&self, product_id: ProductId) {
        self.products
            .remove_if(&product_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
