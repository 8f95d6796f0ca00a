//! Storage boundary for the image catalog: the repository port plus its
//! Postgres and in-memory adapters.

pub mod infrastructure;
pub mod ports;

pub use infrastructure::memory::InMemoryProductImageRepository;
pub use infrastructure::postgres::{
    PostgresDatabase, advisory::AdvisoryProductLock,
    images::PostgresProductImageRepository, legacy::LegacyOrderColumns,
};
pub use ports::images::{ProductImageRepository, StorageLock};
