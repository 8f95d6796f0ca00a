use std::{collections::BTreeSet, fmt, sync::Arc};

use futures::{Stream, StreamExt, stream};
use storefront_model::{ImageFilter, ImagePatch, ProductId};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::{
    database::ports::images::{ProductImageRepository, StorageLock},
    error::{CatalogError, Result},
    ordering::{
        audit::{AuditReport, audit_images},
        locks::ProductLocks,
        plan::{plan_positions, plan_primary},
        report::{RepairReport, RepairStage},
        summary::CatalogSummary,
    },
};

#[derive(Debug, Clone)]
pub struct OrderingOptions {
    /// How many products `repair_all` may work on at once. Reports are
    /// still yielded in product order.
    pub parallelism: usize,
}

impl Default for OrderingOptions {
    fn default() -> Self {
        Self { parallelism: 1 }
    }
}

/// Keeps each product's gallery ordered `1..=N` with the position-1 image as
/// the only primary.
///
/// Every mutating operation runs under the product's lock from
/// [`ProductLocks`] and, when the repository offers one, its storage lock.
/// Share the same locks (via [`Self::with_locks`] or [`Self::lock_product`])
/// with any other writer of the image table that lives in this process.
#[derive(Clone)]
pub struct ImageOrderingService {
    repo: Arc<dyn ProductImageRepository>,
    locks: Arc<ProductLocks>,
    options: OrderingOptions,
}

impl fmt::Debug for ImageOrderingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageOrderingService")
            .field("locks", &self.locks.len())
            .field("options", &self.options)
            .finish()
    }
}

impl ImageOrderingService {
    pub fn new(repo: Arc<dyn ProductImageRepository>) -> Self {
        Self::with_options(repo, OrderingOptions::default())
    }

    pub fn with_options(
        repo: Arc<dyn ProductImageRepository>,
        options: OrderingOptions,
    ) -> Self {
        Self {
            repo,
            locks: Arc::new(ProductLocks::new()),
            options,
        }
    }

    pub fn with_locks(mut self, locks: Arc<ProductLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn locks(&self) -> &Arc<ProductLocks> {
        &self.locks
    }

    pub fn options(&self) -> &OrderingOptions {
        &self.options
    }

    /// Exclusive access to one product's gallery, for admin edits in this
    /// process that must not interleave with a repair. The storage lock is
    /// not taken; writers in other processes go through
    /// [`ProductImageRepository::lock_product`].
    pub async fn lock_product(&self, product_id: ProductId) -> OwnedMutexGuard<()> {
        self.locks.lock(product_id).await
    }

    /// Re-sequence a product's images by upload time. Only rows whose
    /// position changes are written.
    pub async fn normalize_positions(&self, product_id: ProductId) -> Result<RepairReport> {
        let held = self.hold(product_id).await?;
        let outcome = self.normalize_locked(product_id).await;
        self.release(held).await;
        outcome.map_err(|failure| failure.error)
    }

    /// Make the position-1 image the product's only primary.
    pub async fn assign_primary(&self, product_id: ProductId) -> Result<RepairReport> {
        let held = self.hold(product_id).await?;
        let outcome = self.assign_primary_locked(product_id).await;
        self.release(held).await;
        outcome.map_err(|failure| failure.error)
    }

    /// One full repair pass (normalize, then assign primary) under a single
    /// hold of the product lock. Errors end up in the report, together with
    /// the writes that landed before them.
    pub async fn repair_product(&self, product_id: ProductId) -> RepairReport {
        let held = match self.hold(product_id).await {
            Ok(held) => held,
            Err(err) => {
                warn!(%product_id, error = %err, "could not lock product for repair");
                return RepairReport::failed(product_id, RepairStage::Normalize, &err);
            }
        };
        let report = self.repair_held(product_id).await;
        self.release(held).await;
        report
    }

    async fn repair_held(&self, product_id: ProductId) -> RepairReport {
        let normalized = match self.normalize_locked(product_id).await {
            Ok(report) => report,
            Err(StepFailure { partial, error }) => {
                warn!(%product_id, error = %error, "position normalization failed");
                return partial.with_failure(RepairStage::Normalize, &error);
            }
        };

        match self.assign_primary_locked(product_id).await {
            Ok(primary) => normalized.absorb(primary),
            Err(StepFailure { partial, error }) => {
                warn!(%product_id, error = %error, "primary assignment failed");
                normalized
                    .absorb(partial)
                    .with_failure(RepairStage::AssignPrimary, &error)
            }
        }
    }

    /// In-process lock first, then the storage lock, so local callers queue
    /// on the mutex instead of each holding a storage connection.
    async fn hold(&self, product_id: ProductId) -> Result<HeldProduct> {
        let guard = self.locks.lock(product_id).await;
        match self.repo.lock_product(product_id).await {
            Ok(storage) => Ok(HeldProduct {
                product_id,
                storage,
                guard,
            }),
            Err(err) => {
                drop(guard);
                self.locks.release_idle(product_id);
                Err(err)
            }
        }
    }

    async fn release(&self, held: HeldProduct) {
        let HeldProduct {
            product_id,
            storage,
            guard,
        } = held;
        if let Some(lock) = storage
            && let Err(err) = lock.release().await
        {
            warn!(%product_id, error = %err, "failed to release storage lock");
        }
        drop(guard);
        self.locks.release_idle(product_id);
    }

    /// Distinct products that currently own at least one image, ascending.
    pub async fn product_ids(&self) -> Result<Vec<ProductId>> {
        let images = self.repo.list_all().await?;
        let ids: BTreeSet<ProductId> = images.iter().map(|image| image.product_id).collect();
        Ok(ids.into_iter().collect())
    }

    /// Repair every product that owns images.
    ///
    /// Products are enumerated up front (a failure there is returned); the
    /// repairs themselves run lazily as the stream is polled, one report per
    /// product in ascending id order. A failing product never stops the
    /// others.
    pub async fn repair_all(&self) -> Result<impl Stream<Item = RepairReport> + '_> {
        self.repair_all_with(self.options.parallelism).await
    }

    pub async fn repair_all_with(
        &self,
        parallelism: usize,
    ) -> Result<impl Stream<Item = RepairReport> + '_> {
        let product_ids = self.product_ids().await?;
        info!(
            products = product_ids.len(),
            parallelism, "starting catalog image repair"
        );

        Ok(stream::iter(product_ids)
            .map(move |product_id| self.repair_product(product_id))
            .buffered(parallelism.max(1)))
    }

    /// Check both ordering invariants without writing anything.
    pub async fn audit_consistency(&self) -> Result<AuditReport> {
        let images = self.repo.list_all().await?;
        let report = audit_images(&images);
        if report.is_consistent() {
            info!(products = report.products_checked, "image catalog is consistent");
        } else {
            warn!(
                products = report.products_checked,
                violations = report.violation_count(),
                "image catalog has ordering violations"
            );
        }
        Ok(report)
    }

    pub async fn summarize_catalog(&self) -> Result<CatalogSummary> {
        let all = self.repo.list_all().await?;
        let primaries = self.repo.list_images(&ImageFilter::primaries()).await?;
        let unpositioned = self.repo.list_images(&ImageFilter::unpositioned()).await?;
        Ok(CatalogSummary::from_rows(&all, &primaries, &unpositioned))
    }

    async fn normalize_locked(&self, product_id: ProductId) -> StepResult {
        let images = self
            .repo
            .list_for_product(product_id)
            .await
            .map_err(StepFailure::untouched(product_id))?;
        if images.is_empty() {
            debug!(%product_id, "no images; nothing to normalize");
            return Ok(RepairReport::ok(product_id, 0, 0));
        }

        let changes = plan_positions(&images).map_err(StepFailure::untouched(product_id))?;
        for (written, change) in changes.iter().enumerate() {
            if let Err(error) = self
                .repo
                .update_image(change.id, &ImagePatch::position(change.to))
                .await
            {
                return Err(StepFailure {
                    partial: RepairReport::ok(product_id, images.len(), written),
                    error,
                });
            }
        }

        if !changes.is_empty() {
            info!(
                %product_id,
                images = images.len(),
                moved = changes.len(),
                "normalized image positions"
            );
        }
        Ok(RepairReport::ok(product_id, images.len(), changes.len()))
    }

    async fn assign_primary_locked(&self, product_id: ProductId) -> StepResult {
        let images = self
            .repo
            .list_for_product(product_id)
            .await
            .map_err(StepFailure::untouched(product_id))?;
        let Some(plan) =
            plan_primary(product_id, &images).map_err(StepFailure::untouched(product_id))?
        else {
            return Ok(RepairReport::ok(product_id, 0, 0));
        };

        // All clears land before the set; the product lock keeps other
        // writers from observing the gap in between.
        let mut writes = plan
            .clear
            .iter()
            .map(|id| (*id, ImagePatch::primary(false)))
            .collect::<Vec<_>>();
        if plan.set_front {
            writes.push((plan.front, ImagePatch::primary(true)));
        }
        for (written, (id, patch)) in writes.iter().enumerate() {
            if let Err(error) = self.repo.update_image(*id, patch).await {
                return Err(StepFailure {
                    partial: RepairReport::ok(product_id, images.len(), written),
                    error,
                });
            }
        }

        if !plan.is_noop() {
            info!(
                %product_id,
                primary = %plan.front,
                cleared = plan.clear.len(),
                "assigned primary image"
            );
        }
        Ok(RepairReport::ok(product_id, images.len(), plan.toggles()))
    }
}

/// Both locks on one product, handed back to `release`.
struct HeldProduct {
    product_id: ProductId,
    storage: Option<Box<dyn StorageLock>>,
    guard: OwnedMutexGuard<()>,
}

/// A step that stopped early, with the counts of what it wrote first.
struct StepFailure {
    partial: RepairReport,
    error: CatalogError,
}

impl StepFailure {
    fn untouched(product_id: ProductId) -> impl FnOnce(CatalogError) -> Self {
        move |error| Self {
            partial: RepairReport::ok(product_id, 0, 0),
            error,
        }
    }
}

type StepResult = std::result::Result<RepairReport, StepFailure>;
