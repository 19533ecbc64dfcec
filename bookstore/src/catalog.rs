//! The book query catalog.
//!
//! Each [`BookCatalog`] operation issues a single filter, mutation or aggregation
//! against the store (pagination also counts) and returns a typed result. Operations
//! hold no state between calls; an empty result is never an error.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, info};

use bookstore_core::{
    backend::{DynStoreBackend, StoreBackend},
    collection::TypedCollection,
    error::DocumentStoreError,
    page::{Page, PaginationParams},
    pipeline::{Accumulator, GroupKey, Pipeline},
    query::{Filter, Projection, Query, Sort, SortDirection},
    store::DocumentStore,
    update::{DeleteOutcome, Update, UpdateOutcome},
};

use crate::{
    admin::CatalogAdmin,
    book::{AuthorCount, Book, BookSummary, DecadeCount, validate_price},
    config::{DEFAULT_COLLECTION, DEFAULT_PAGE_SIZE},
    error::{CatalogError, CatalogResult},
};

#[derive(Deserialize)]
struct GenreAverage {
    #[serde(rename = "_id")]
    genre: Option<String>,
    #[serde(rename = "averagePrice")]
    average_price: Option<f64>,
}

#[derive(Deserialize)]
struct AuthorRow {
    #[serde(rename = "_id")]
    author: Option<String>,
    #[serde(rename = "bookCount")]
    book_count: u64,
}

#[derive(Deserialize)]
struct DecadeRow {
    #[serde(rename = "_id")]
    decade: Option<i64>,
    count: u64,
}

/// Typed queries over the books collection.
///
/// Generic over the backend; the default is the runtime-selected backend that
/// [`CatalogConfig::connect`](crate::config::CatalogConfig::connect) produces.
///
/// ```ignore
/// use bookstore::{catalog::BookCatalog, memory::InMemoryStore, store::DocumentStore};
///
/// let catalog = BookCatalog::new(DocumentStore::new(InMemoryStore::new()));
/// let fantasy = catalog.find_by_genre("Fantasy").await?;
/// ```
#[derive(Debug)]
pub struct BookCatalog<B: StoreBackend = Box<dyn DynStoreBackend>> {
    store: DocumentStore<B>,
    collection: String,
    page_size: usize,
}

impl<B: StoreBackend> BookCatalog<B> {
    pub fn new(store: DocumentStore<B>) -> Self {
        Self {
            store,
            collection: DEFAULT_COLLECTION.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Reads and writes `collection` instead of `books`.
    pub fn with_collection(mut self, collection: &str) -> Self {
        self.collection = collection.to_string();
        self
    }

    /// Page size used by [`paginate`](Self::paginate).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Index declarations and query plan diagnostics for the same collection.
    pub fn admin(&self) -> CatalogAdmin<'_, B> {
        CatalogAdmin::new(self.books())
    }

    pub(crate) fn books(&self) -> TypedCollection<'_, B, Book> {
        self.store.typed_collection_named::<Book>(&self.collection)
    }

    /// Validates every book, then inserts them all. Nothing is written if any book is invalid.
    pub async fn insert_books(&self, books: Vec<Book>) -> CatalogResult<()> {
        for book in &books {
            book.validate()?;
        }

        let inserted = books.len();
        self.books().insert(books).await?;
        info!(collection = %self.collection, inserted, "inserted books");

        Ok(())
    }

    /// Number of books in the collection.
    pub async fn count(&self) -> CatalogResult<u64> {
        Ok(self.books().count(None).await?)
    }

    /// Books whose genre equals `genre` exactly (case-sensitive).
    pub async fn find_by_genre(&self, genre: &str) -> CatalogResult<Vec<Book>> {
        let books = self.books().query(Query::filtered(Filter::eq("genre", genre))).await?;
        debug!(genre, found = books.len(), "find_by_genre");

        Ok(books)
    }

    /// Books published strictly after `year`.
    pub async fn find_published_after(&self, year: i32) -> CatalogResult<Vec<Book>> {
        let books = self.books().query(Query::filtered(Filter::gt("published_year", year))).await?;
        debug!(year, found = books.len(), "find_published_after");

        Ok(books)
    }

    pub async fn find_by_author(&self, author: &str) -> CatalogResult<Vec<Book>> {
        let books = self.books().query(Query::filtered(Filter::eq("author", author))).await?;
        debug!(author, found = books.len(), "find_by_author");

        Ok(books)
    }

    /// Sets the price of the first book titled `title`.
    ///
    /// At most one book changes. A missing title reports `matched: 0`.
    pub async fn update_book_price(&self, title: &str, price: f64) -> CatalogResult<UpdateOutcome> {
        validate_price(price)?;

        let outcome = self
            .books()
            .update_one(Filter::eq("title", title), Update::set("price", price))
            .await?;
        info!(title, price, matched = outcome.matched, modified = outcome.modified, "update_book_price");

        Ok(outcome)
    }

    /// Deletes the first book titled `title`, if any.
    pub async fn delete_book_by_title(&self, title: &str) -> CatalogResult<DeleteOutcome> {
        let outcome = self.books().delete_one(Filter::eq("title", title)).await?;
        info!(title, deleted = outcome.deleted, "delete_book_by_title");

        Ok(outcome)
    }

    /// In-stock books published strictly after `year`.
    pub async fn find_in_stock_after_year(&self, year: i32) -> CatalogResult<Vec<Book>> {
        let filter = Filter::eq("in_stock", true).and(Filter::gt("published_year", year));
        let books = self.books().query(Query::filtered(filter)).await?;
        debug!(year, found = books.len(), "find_in_stock_after_year");

        Ok(books)
    }

    /// Title, author and price of every book.
    pub async fn project_summary(&self) -> CatalogResult<Vec<BookSummary>> {
        let query = Query::builder()
            .projection(Projection::include(["title", "author", "price"]))
            .build();

        Ok(self.books().query_as::<BookSummary>(query).await?)
    }

    /// Every book ordered by price. Equal prices keep the store's natural order.
    pub async fn sort_by_price(&self, direction: SortDirection) -> CatalogResult<Vec<Book>> {
        let books = self
            .books()
            .query(Query::builder().sort("price", direction).build())
            .await?;
        debug!(?direction, found = books.len(), "sort_by_price");

        Ok(books)
    }

    /// Page `page` (1-indexed) at the configured page size.
    pub async fn paginate(&self, page: usize) -> CatalogResult<Page<Book>> {
        self.paginate_with(page, self.page_size).await
    }

    /// Page `page` (1-indexed) of `page_size` books in natural order.
    ///
    /// Pages past the end are empty, not errors.
    pub async fn paginate_with(&self, page: usize, page_size: usize) -> CatalogResult<Page<Book>> {
        let params = PaginationParams::new(page, page_size).map_err(|error| match error {
            DocumentStoreError::InvalidQuery(message) => CatalogError::InvalidArgument(message),
            other => other.into(),
        })?;

        let books = self.books();
        let items = books
            .query(
                Query::builder()
                    .offset(params.offset())
                    .limit(params.per_page)
                    .build(),
            )
            .await?;
        let total = books.count(None).await?;
        debug!(page, page_size, found = items.len(), total, "paginate");

        Ok(params.page_of(items, total as usize))
    }

    /// Mean price per genre.
    pub async fn average_price_by_genre(&self) -> CatalogResult<BTreeMap<String, f64>> {
        let pipeline = Pipeline::new()
            .group(GroupKey::field("genre"), [("averagePrice", Accumulator::Avg("price".into()))]);

        let averages: BTreeMap<String, f64> = self
            .books()
            .aggregate_as::<GenreAverage>(pipeline)
            .await?
            .into_iter()
            .filter_map(|row| Some((row.genre?, row.average_price?)))
            .collect();
        debug!(genres = averages.len(), "average_price_by_genre");

        Ok(averages)
    }

    /// The author with the most books; ties go to the alphabetically first author.
    pub async fn author_with_most_books(&self) -> CatalogResult<Option<AuthorCount>> {
        let pipeline = Pipeline::new()
            .group(GroupKey::field("author"), [("bookCount", Accumulator::Count)])
            .sort([Sort::desc("bookCount"), Sort::asc("_id")])
            .limit(1);

        let top = self
            .books()
            .aggregate_as::<AuthorRow>(pipeline)
            .await?
            .into_iter()
            .find_map(|row| Some(AuthorCount { author: row.author?, count: row.book_count }));
        debug!(author = ?top.as_ref().map(|top| &top.author), "author_with_most_books");

        Ok(top)
    }

    /// Books per decade, oldest decade first.
    pub async fn count_by_decade(&self) -> CatalogResult<Vec<DecadeCount>> {
        let pipeline = Pipeline::new()
            .group(GroupKey::bucket("published_year", 10), [("count", Accumulator::Count)])
            .sort([Sort::asc("_id")]);

        let decades: Vec<DecadeCount> = self
            .books()
            .aggregate_as::<DecadeRow>(pipeline)
            .await?
            .into_iter()
            .filter_map(|row| Some(DecadeCount { decade: row.decade?, count: row.count }))
            .collect();
        debug!(decades = decades.len(), "count_by_decade");

        Ok(decades)
    }

    /// Shuts down the underlying store.
    pub async fn shutdown(self) -> CatalogResult<()> {
        Ok(self.store.shutdown().await?)
    }
}
