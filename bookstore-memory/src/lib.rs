//! In-memory document storage backend for the bookstore catalog.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and backs the catalog's
//! tests and local runs without a database server.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Natural order** - Documents keep insertion order; sorts are stable
//! - **Secondary indexes** - Declared indexes are maintained and used for equality lookups
//! - **Aggregation** - Match, group (with numeric buckets), sort, skip and limit stages
//! - **Explain** - Reports the access path and counters a query actually used
//!
//! # Quick Start
//!
//! ```ignore
//! use bookstore_core::{backend::StoreBackendBuilder, store::DocumentStore};
//! use bookstore_memory::InMemoryStore;
//!
//! let backend = InMemoryStore::builder().build().await?;
//! let store = DocumentStore::new(backend);
//! let books = store.typed_collection::<Book>();
//!
//! books.insert(vec![book]).await?;
//! ```

pub mod store;
mod evaluator;

mod aggregator;
mod index;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
