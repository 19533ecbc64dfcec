//! MongoDB backend for the bookstore catalog.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait,
//! delegating filtering, sorting, aggregation, indexing and explain to the server.
//!
//! To use this backend, enable the `mongodb` feature of the `bookstore` crate:
//!
//! ```toml
//! [dependencies]
//! bookstore = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The client is created from a connection string and a database name through
//! [`MongoDbStoreBuilder`]. The driver connects lazily, so connection failures are
//! reported by the first operation as `DocumentStoreError::Unavailable`.
//!
//! # Example
//!
//! ```ignore
//! use bookstore_core::backend::StoreBackendBuilder;
//! use bookstore_mongodb::MongoDbStore;
//!
//! let store = MongoDbStore::builder("mongodb://localhost:27017", "plp_bookstore")
//!     .build()
//!     .await?;
//! ```

pub mod store;
mod query;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
