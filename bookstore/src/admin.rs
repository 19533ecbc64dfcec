//! Administrative operations: index declarations and query plan diagnostics.
//!
//! These live apart from [`BookCatalog`](crate::catalog::BookCatalog) because they
//! change how the store answers queries, never what it answers.

use tracing::{debug, info};

use bookstore_core::{
    backend::StoreBackend,
    collection::TypedCollection,
    index::{ExplainReport, IndexSpec},
    query::{Filter, Query, SortDirection},
};

use crate::{book::Book, error::CatalogResult};

pub struct CatalogAdmin<'a, B: StoreBackend> {
    books: TypedCollection<'a, B, Book>,
}

impl<'a, B: StoreBackend> CatalogAdmin<'a, B> {
    pub(crate) fn new(books: TypedCollection<'a, B, Book>) -> Self {
        Self { books }
    }

    /// Ascending index on `title`. Idempotent; returns `title_1`.
    pub async fn ensure_title_index(&self) -> CatalogResult<String> {
        let name = self.books.create_index(IndexSpec::ascending("title")).await?;
        info!(collection = self.books.name(), index = %name, "ensured index");

        Ok(name)
    }

    /// Compound ascending index on `(author, published_year)`. Idempotent; returns
    /// `author_1_published_year_1`.
    pub async fn ensure_author_year_index(&self) -> CatalogResult<String> {
        let spec = IndexSpec::builder()
            .key("author", SortDirection::Asc)
            .key("published_year", SortDirection::Asc)
            .build();

        let name = self.books.create_index(spec).await?;
        info!(collection = self.books.name(), index = %name, "ensured index");

        Ok(name)
    }

    /// How the store executes a lookup by title.
    pub async fn explain_title_lookup(&self, title: &str) -> CatalogResult<ExplainReport> {
        let report = self
            .books
            .explain(Query::filtered(Filter::eq("title", title)))
            .await?;
        debug!(title, index_used = report.index_used, index = ?report.index_name, "explain_title_lookup");

        Ok(report)
    }

    /// How the store executes a lookup by author and publication year.
    pub async fn explain_author_year_lookup(&self, author: &str, year: i32) -> CatalogResult<ExplainReport> {
        let filter = Filter::eq("author", author).and(Filter::eq("published_year", year));
        let report = self.books.explain(Query::filtered(filter)).await?;
        debug!(author, year, index_used = report.index_used, index = ?report.index_name, "explain_author_year_lookup");

        Ok(report)
    }

    /// Declared secondary indexes, without the implicit identifier index.
    pub async fn list_indexes(&self) -> CatalogResult<Vec<IndexSpec>> {
        Ok(self.books.list_indexes().await?)
    }
}
