//! Core data model definitions shared across the storefront crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod customization;
pub mod error;
pub mod ids;
pub mod image;

// Intentionally curated re-exports for downstream consumers.
pub use customization::{CustomizationDraft, ProductOptions, Selection};
pub use error::{ModelError, Result as ModelResult};
pub use ids::{ImageId, ProductId};
pub use image::{ImageFilter, ImagePatch, ProductImage};
