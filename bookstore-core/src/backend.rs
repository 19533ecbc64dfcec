//! Storage backend abstraction for the document store.
//!
//! This module defines the traits that abstract over storage implementations, so the
//! same collections and catalog code run against the in-memory store or MongoDB.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: Object-safe mirror of [`StoreBackend`] for runtime backend selection
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! `Box<dyn DynStoreBackend>` itself implements [`StoreBackend`], so a boxed backend
//! can be used anywhere a concrete one can.
//!
//! # Examples
//!
//! ```ignore
//! use bookstore_core::{backend::StoreBackend, query::{Filter, Query}};
//! use bson::{Bson, Uuid, doc};
//!
//! let doc = Bson::Document(doc! { "title": "1984", "price": 15.0 });
//! backend.insert_documents(vec![(Uuid::new(), doc)], "books").await?;
//!
//! let found = backend
//!     .query_documents(Query::filtered(Filter::eq("title", "1984")), "books")
//!     .await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, Uuid};
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    index::{ExplainReport, IndexSpec},
    pipeline::Pipeline,
    query::{Expr, Query},
    update::{DeleteOutcome, Update, UpdateOutcome},
};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` and tolerate concurrent calls. Each
/// single-document write must be atomic with respect to the document it targets;
/// read isolation across documents is whatever the backend provides.
///
/// # Natural Order
///
/// Queries without a sort, the "first match" of [`update_one`](Self::update_one) and
/// [`delete_one`](Self::delete_one), and pipelines without a sort stage all follow the
/// backend's natural order. Backends document what that order is.
///
/// # Error Handling
///
/// Zero matches are never an error. Backends report an unreachable store as
/// [`DocumentStoreError::Unavailable`](crate::error::DocumentStoreError::Unavailable).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection, creating the collection on first use.
    ///
    /// # Arguments
    ///
    /// * `documents` - (identifier, BSON document) pairs to insert
    /// * `collection` - The name of the collection to insert into
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Queries documents using filter, sort, offset, limit and projection.
    ///
    /// A missing collection yields an empty result.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Counts documents matching the filter, or all documents without one.
    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64>;

    /// Applies `update` to the first document matching `filter`.
    ///
    /// Never modifies more than one document. No match yields `matched: 0`.
    async fn update_one(
        &self,
        filter: Expr,
        update: Update,
        collection: &str,
    ) -> DocumentStoreResult<UpdateOutcome>;

    /// Removes the first document matching `filter`.
    ///
    /// Never removes more than one document. No match yields `deleted: 0`.
    async fn delete_one(&self, filter: Expr, collection: &str) -> DocumentStoreResult<DeleteOutcome>;

    /// Runs an aggregation pipeline and returns the documents of its last stage.
    async fn aggregate(
        &self,
        pipeline: Pipeline,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Declares a secondary index and returns its name.
    ///
    /// Declaring an index whose key pattern already exists is a no-op that returns the
    /// existing name.
    async fn create_index(&self, index: IndexSpec, collection: &str) -> DocumentStoreResult<String>;

    /// Lists declared secondary indexes, excluding any implicit identifier index.
    async fn list_indexes(&self, collection: &str) -> DocumentStoreResult<Vec<IndexSpec>>;

    /// Describes how the backend executes `query`, including whether an index was used.
    async fn explain(&self, query: Query, collection: &str) -> DocumentStoreResult<ExplainReport>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op; backends holding connections override it.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe form of [`StoreBackend`].
///
/// Blanket-implemented for every [`StoreBackend`]; use `Box<dyn DynStoreBackend>` when
/// the backend is chosen at runtime.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;
    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64>;
    async fn update_one(
        &self,
        filter: Expr,
        update: Update,
        collection: &str,
    ) -> DocumentStoreResult<UpdateOutcome>;
    async fn delete_one(&self, filter: Expr, collection: &str) -> DocumentStoreResult<DeleteOutcome>;
    async fn aggregate(
        &self,
        pipeline: Pipeline,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;
    async fn create_index(&self, index: IndexSpec, collection: &str) -> DocumentStoreResult<String>;
    async fn list_indexes(&self, collection: &str) -> DocumentStoreResult<Vec<IndexSpec>>;
    async fn explain(&self, query: Query, collection: &str) -> DocumentStoreResult<ExplainReport>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::insert_documents(self, documents, collection).await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::query_documents(self, query, collection).await
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        StoreBackend::count_documents(self, filter, collection).await
    }

    async fn update_one(
        &self,
        filter: Expr,
        update: Update,
        collection: &str,
    ) -> DocumentStoreResult<UpdateOutcome> {
        StoreBackend::update_one(self, filter, update, collection).await
    }

    async fn delete_one(&self, filter: Expr, collection: &str) -> DocumentStoreResult<DeleteOutcome> {
        StoreBackend::delete_one(self, filter, collection).await
    }

    async fn aggregate(
        &self,
        pipeline: Pipeline,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::aggregate(self, pipeline, collection).await
    }

    async fn create_index(&self, index: IndexSpec, collection: &str) -> DocumentStoreResult<String> {
        StoreBackend::create_index(self, index, collection).await
    }

    async fn list_indexes(&self, collection: &str) -> DocumentStoreResult<Vec<IndexSpec>> {
        StoreBackend::list_indexes(self, collection).await
    }

    async fn explain(&self, query: Query, collection: &str) -> DocumentStoreResult<ExplainReport> {
        StoreBackend::explain(self, query, collection).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }
}

#[async_trait]
impl StoreBackend for Box<dyn DynStoreBackend> {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        (**self)
            .insert_documents(documents, collection)
            .await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        (**self)
            .query_documents(query, collection)
            .await
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        (**self)
            .count_documents(filter, collection)
            .await
    }

    async fn update_one(
        &self,
        filter: Expr,
        update: Update,
        collection: &str,
    ) -> DocumentStoreResult<UpdateOutcome> {
        (**self)
            .update_one(filter, update, collection)
            .await
    }

    async fn delete_one(&self, filter: Expr, collection: &str) -> DocumentStoreResult<DeleteOutcome> {
        (**self)
            .delete_one(filter, collection)
            .await
    }

    async fn aggregate(
        &self,
        pipeline: Pipeline,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        (**self)
            .aggregate(pipeline, collection)
            .await
    }

    async fn create_index(&self, index: IndexSpec, collection: &str) -> DocumentStoreResult<String> {
        (**self)
            .create_index(index, collection)
            .await
    }

    async fn list_indexes(&self, collection: &str) -> DocumentStoreResult<Vec<IndexSpec>> {
        (**self).list_indexes(collection).await
    }

    async fn explain(&self, query: Query, collection: &str) -> DocumentStoreResult<ExplainReport> {
        (**self).explain(query, collection).await
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        <dyn DynStoreBackend>::shutdown_boxed(self).await
    }
}

/// Factory for backend instances, implemented by each backend's builder.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
