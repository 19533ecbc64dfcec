//! Typed query catalog over a document collection of books.
//!
//! This crate is the entry point of the bookstore workspace. It defines the [`Book`]
//! model, the [`BookCatalog`] of read, write and aggregation queries, the
//! [`CatalogAdmin`] index and explain operations, and configuration for picking a
//! backend at runtime. Core store types and both backends are re-exported.
//!
//! # Features
//!
//! - **Typed queries** - Genre, author and year lookups, projections, sorting and pagination
//! - **Single-document writes** - Price updates and deletes that touch at most one book
//! - **Aggregations** - Average price per genre, most prolific author, books per decade
//! - **Index administration** - Idempotent index creation and explain diagnostics
//! - **Multiple backends** - In-memory storage, or MongoDB with the `mongodb` feature
//!
//! # Quick Start
//!
//! ```ignore
//! use bookstore::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> CatalogResult<()> {
//!     let catalog = CatalogConfig::from_env()?.connect().await?;
//!
//!     catalog
//!         .insert_books(vec![Book::new("1984", "George Orwell", "Dystopian", 1949, 15.0, true)])
//!         .await?;
//!
//!     let outcome = catalog.update_book_price("1984", 19.99).await?;
//!     assert_eq!(outcome.matched, 1);
//!
//!     for decade in catalog.count_by_decade().await? {
//!         println!("{}: {}", decade.label(), decade.count);
//!     }
//!
//!     let admin = catalog.admin();
//!     admin.ensure_title_index().await?;
//!     assert!(admin.explain_title_lookup("1984").await?.index_used);
//!
//!     catalog.shutdown().await
//! }
//! ```
//!
//! # Static Dispatch
//!
//! A catalog can also be built over a concrete backend, which keeps the backend type
//! visible:
//!
//! ```ignore
//! use bookstore::{catalog::BookCatalog, memory::InMemoryStore, store::DocumentStore};
//!
//! let catalog = BookCatalog::new(DocumentStore::new(InMemoryStore::new()));
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for tests and local runs
//! - [`mongodb`] - MongoDB backend (requires `mongodb` feature)

pub mod admin;
pub mod book;
pub mod catalog;
pub mod config;
pub mod error;
pub mod prelude;

pub use admin::CatalogAdmin;
pub use book::{AuthorCount, Book, BookSummary, DecadeCount};
pub use catalog::BookCatalog;
pub use config::{BackendConfig, CatalogConfig};
pub use error::{CatalogError, CatalogResult};

pub use bookstore_core::{backend, collection, document, index, page, pipeline, query, store, update};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use bookstore_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use bookstore_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
