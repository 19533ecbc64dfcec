//! Typed collection handle.
//!
//! A [`TypedCollection`] binds a collection name, a backend reference and a document
//! type. Full documents come back as `D`; projections and pipeline output, which are
//! not full documents, are decoded into any serde type with the `*_as` methods.
//!
//! # Example
//!
//! ```ignore
//! use bookstore_core::query::{Filter, Query};
//!
//! let books = store.typed_collection::<Book>();
//! books.insert(vec![book]).await?;
//!
//! let orwell = books
//!     .query(Query::filtered(Filter::eq("author", "George Orwell")))
//!     .await?;
//! ```

use bson::{Bson, Uuid};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

use crate::{
    backend::StoreBackend,
    document::{Document, DocumentExt, decode_bson},
    error::DocumentStoreResult,
    index::{ExplainReport, IndexSpec},
    pipeline::Pipeline,
    query::{Expr, Query},
    update::{DeleteOutcome, Update, UpdateOutcome},
};

#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, D: Document> {
    name: String,
    backend: &'a B,
    _marker: PhantomData<D>,
}

impl<'a, B: StoreBackend, D: Document> TypedCollection<'a, B, D> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts new documents into the collection.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if serialization or insertion fails.
    pub async fn insert(&self, documents: Vec<D>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(
                documents
                    .into_iter()
                    .map(|d| d.to_bson().map(move |b| (d.id().clone(), b)))
                    .collect::<Result<Vec<(Uuid, Bson)>, _>>()?,
                self.name(),
            )
            .await
    }

    /// Queries full documents.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<D>> {
        self.backend
            .query_documents(query, self.name())
            .await?
            .into_iter()
            .map(D::from_bson)
            .collect()
    }

    /// Queries documents and decodes each one as `T`, typically a projection shape.
    pub async fn query_as<T: DeserializeOwned>(&self, query: Query) -> DocumentStoreResult<Vec<T>> {
        self.backend
            .query_documents(query, self.name())
            .await?
            .into_iter()
            .map(decode_bson)
            .collect()
    }

    /// Counts documents matching the filter, or every document without one.
    pub async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.backend
            .count_documents(filter, self.name())
            .await
    }

    /// Updates the first document matching the filter.
    pub async fn update_one(&self, filter: Expr, update: Update) -> DocumentStoreResult<UpdateOutcome> {
        self.backend
            .update_one(filter, update, self.name())
            .await
    }

    /// Deletes the first document matching the filter.
    pub async fn delete_one(&self, filter: Expr) -> DocumentStoreResult<DeleteOutcome> {
        self.backend
            .delete_one(filter, self.name())
            .await
    }

    /// Runs a pipeline and decodes each output document as `T`.
    pub async fn aggregate_as<T: DeserializeOwned>(&self, pipeline: Pipeline) -> DocumentStoreResult<Vec<T>> {
        self.backend
            .aggregate(pipeline, self.name())
            .await?
            .into_iter()
            .map(decode_bson)
            .collect()
    }

    /// Declares an index on this collection and returns its name.
    pub async fn create_index(&self, index: IndexSpec) -> DocumentStoreResult<String> {
        self.backend
            .create_index(index, self.name())
            .await
    }

    /// Lists declared secondary indexes.
    pub async fn list_indexes(&self) -> DocumentStoreResult<Vec<IndexSpec>> {
        self.backend.list_indexes(self.name()).await
    }

    /// Explains how the backend executes the query.
    pub async fn explain(&self, query: Query) -> DocumentStoreResult<ExplainReport> {
        self.backend
            .explain(query, self.name())
            .await
    }
}
