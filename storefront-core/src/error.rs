use storefront_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// The storage backend could not be reached or rejected a query/update.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl CatalogError {
    /// Only transport/backend failures are worth re-running; the other kinds
    /// point at bad data or a logic bug and will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::StorageUnavailable(_))
    }
}

impl From<ModelError> for CatalogError {
    fn from(err: ModelError) -> Self {
        CatalogError::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
