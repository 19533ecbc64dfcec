//! Document store entry point.
//!
//! [`DocumentStore`] owns a backend and hands out typed collections. A store over a
//! concrete backend can be turned into a [`DynDocumentStore`], which keeps the same
//! API while the backend is chosen at runtime.
//!
//! # Example
//!
//! ```ignore
//! use bookstore_core::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let books = store.typed_collection::<Book>();
//! ```

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::TypedCollection,
    document::Document,
    error::DocumentStoreResult,
};

/// A document store bound to a backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

/// A document store whose backend is selected at runtime.
pub type DynDocumentStore = DocumentStore<Box<dyn DynStoreBackend>>;

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Gets a typed collection named by the document type's `collection_name()`.
    pub fn typed_collection<D: Document>(&self) -> TypedCollection<'_, B, D> {
        TypedCollection::new(D::collection_name().to_string(), &self.backend)
    }

    /// Gets a typed collection stored under an explicit name.
    pub fn typed_collection_named<D: Document>(&self, name: &str) -> TypedCollection<'_, B, D> {
        TypedCollection::new(name.to_string(), &self.backend)
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

impl<B: StoreBackend + 'static> DocumentStore<B> {
    /// Boxes the backend so the store's type no longer names it.
    pub fn into_dyn(self) -> DynDocumentStore {
        DocumentStore::new(Box::new(self.backend) as Box<dyn DynStoreBackend>)
    }
}
