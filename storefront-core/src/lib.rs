//! # Storefront Core
//!
//! Maintenance library for the storefront's product-image catalog.
//!
//! Every product owns an ordered gallery of images. Two invariants keep the
//! gallery renderable:
//!
//! - positions form the gapless sequence `1..=N` per product, and
//! - exactly one image per product is primary, and it is the one at
//!   position 1.
//!
//! Uploads and admin edits routinely break both. This crate repairs them
//! idempotently and audits them read-only.
//!
//! ## Architecture
//!
//! - [`database`]: the [`ProductImageRepository`](database::ProductImageRepository)
//!   port with Postgres and in-memory adapters, plus the one-time legacy
//!   order-column consolidation.
//! - [`ordering`]: the [`ImageOrderingService`](ordering::ImageOrderingService),
//!   its per-product locks, audit, and catalog summary.
//! - [`error`]: the crate-wide error type.
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use storefront_core::{database::PostgresDatabase, ordering::ImageOrderingService};
//!
//! async fn repair(database_url: &str) -> storefront_core::error::Result<()> {
//!     let db = PostgresDatabase::new(database_url, 5).await?;
//!     let service = ImageOrderingService::new(Arc::new(db.images()));
//!
//!     let reports: Vec<_> = service.repair_all().await?.collect().await;
//!     for report in reports.iter().filter(|r| !r.is_ok()) {
//!         eprintln!("product {} failed: {:?}", report.product_id, report.failure);
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod database;
pub mod error;
pub mod ordering;

pub use error::{CatalogError, Result};
pub use storefront_model as model;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
