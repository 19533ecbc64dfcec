//! Core abstractions for the bookstore document catalog.
//!
//! This crate provides:
//!
//! - **Document traits** ([`document`]) - Core traits for defining and serializing documents
//! - **Store backend abstraction** ([`backend`]) - Traits implemented by the in-memory and MongoDB backends
//! - **Query and filtering API** ([`query`]) - Filter expressions, sorting, projection
//! - **Single-document writes** ([`update`]) - Update specs and update/delete outcomes
//! - **Aggregation pipelines** ([`pipeline`]) - Match, group, sort, skip and limit stages
//! - **Indexes and explain** ([`index`]) - Index declarations and plan diagnostics
//! - **Collections interface** ([`collection`]) - Typed handle over one collection
//! - **Document store** ([`store`]) - Owns a backend and hands out collections
//! - **Pagination** ([`page`]) - Page parameters and result pages
//! - **Error handling** ([`error`]) - Store error and result types
//!
//! # Example
//!
//! ```ignore
//! use bookstore_core::{document::Document, query::{Filter, Query}, store::DocumentStore};
//!
//! let store = DocumentStore::new(backend);
//! let fantasy = store
//!     .typed_collection::<Book>()
//!     .query(Query::filtered(Filter::eq("genre", "Fantasy")))
//!     .await?;
//! ```

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod index;
pub mod page;
pub mod pipeline;
pub mod query;
pub mod store;
pub mod update;
