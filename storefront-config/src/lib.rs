//! Configuration loading for the storefront catalog tools.
//!
//! Values come from three layers, highest precedence first: environment
//! variables (optionally seeded from a `.env` file), a `storefront.toml`
//! file, and built-in defaults. Nothing here reaches for global state beyond
//! reading the process environment once in [`EnvConfig::gather`].
#![allow(missing_docs)]

pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{
    ConfigLoad, ConfigLoader, ConfigLoaderOptions, db_url::DatabaseUrlSource,
    error::ConfigLoadError,
};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{
    CONNECTIONS_PER_REPAIR, Config, ConfigMetadata, DatabaseConfig, RepairConfig,
};
pub use validation::{ConfigWarning, ConfigWarnings};
