use serde::Serialize;
use storefront_model::ProductId;

use crate::error::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStage {
    Normalize,
    AssignPrimary,
}

impl std::fmt::Display for RepairStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepairStage::Normalize => f.write_str("normalize"),
            RepairStage::AssignPrimary => f.write_str("assign-primary"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairFailure {
    pub stage: RepairStage,
    pub message: String,
    pub retryable: bool,
}

/// Outcome of one repair step (or a full pass) for a single product.
///
/// `changed_count` counts rows actually written. A failed report keeps
/// whatever counts the completed steps produced before the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub product_id: ProductId,
    pub record_count: usize,
    pub changed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RepairFailure>,
}

impl RepairReport {
    pub fn ok(product_id: ProductId, record_count: usize, changed_count: usize) -> Self {
        Self {
            product_id,
            record_count,
            changed_count,
            failure: None,
        }
    }

    pub fn failed(product_id: ProductId, stage: RepairStage, err: &CatalogError) -> Self {
        Self::ok(product_id, 0, 0).with_failure(stage, err)
    }

    pub fn with_failure(mut self, stage: RepairStage, err: &CatalogError) -> Self {
        self.failure = Some(RepairFailure {
            stage,
            message: err.to_string(),
            retryable: err.is_retryable(),
        });
        self
    }

    /// Fold a later step of the same pass into this report.
    pub fn absorb(mut self, later: RepairReport) -> Self {
        debug_assert_eq!(self.product_id, later.product_id);
        self.record_count = self.record_count.max(later.record_count);
        self.changed_count += later.changed_count;
        if self.failure.is_none() {
            self.failure = later.failure;
        }
        self
    }

    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}
