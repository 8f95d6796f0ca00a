//! Gallery ordering: keeps every product's images in a gapless 1..N order
//! with exactly one primary image sitting at position 1.

pub mod audit;
pub mod locks;
pub mod plan;
pub mod report;
pub mod service;
pub mod summary;

pub use audit::{AuditReport, PositionMismatch, ProductAuditDetail, audit_images};
pub use locks::ProductLocks;
pub use report::{RepairFailure, RepairReport, RepairStage};
pub use service::{ImageOrderingService, OrderingOptions};
pub use summary::CatalogSummary;
