//! Convenient re-exports of commonly used catalog types.
//!
//! ```ignore
//! use bookstore::prelude::*;
//! ```

pub use crate::{
    admin::CatalogAdmin,
    book::{AuthorCount, Book, BookSummary, DecadeCount},
    catalog::BookCatalog,
    config::{BackendConfig, CatalogConfig},
    error::{CatalogError, CatalogResult},
};

pub use bookstore_core::{
    backend::{StoreBackend, DynStoreBackend, StoreBackendBuilder},
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    index::{ExplainReport, IndexSpec, PlanStage},
    page::Page,
    query::{SortDirection, Filter, Query},
    store::{DocumentStore, DynDocumentStore},
    update::{DeleteOutcome, UpdateOutcome},
};
