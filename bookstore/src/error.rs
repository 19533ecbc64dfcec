use thiserror::Error;

use bookstore_core::error::DocumentStoreError;

/// Errors returned by catalog operations.
///
/// Empty results are never errors: lookups return empty vectors or `None`, and
/// writes report zero matched or deleted documents.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Malformed caller input, rejected before the store is touched.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The document store could not be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error(transparent)]
    Store(DocumentStoreError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<DocumentStoreError> for CatalogError {
    fn from(error: DocumentStoreError) -> Self {
        match error {
            DocumentStoreError::Unavailable(message) => CatalogError::StoreUnavailable(message),
            other => CatalogError::Store(other),
        }
    }
}
