//! The book document and the result shapes catalog queries return.

use bson::Uuid;
use serde::{Deserialize, Serialize};

use bookstore_core::document::Document;

use crate::error::{CatalogError, CatalogResult};

/// A book in the catalog.
///
/// `id` is the store's identifier and is generated when absent from the source data,
/// so fixtures can be written without one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(default = "Uuid::new")]
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_year: i32,
    pub price: f64,
    pub in_stock: bool,
}

impl Document for Book {
    fn id(&self) -> &Uuid {
        &self.id
    }

    fn collection_name() -> &'static str {
        "books"
    }
}

impl Book {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        genre: impl Into<String>,
        published_year: i32,
        price: f64,
        in_stock: bool,
    ) -> Self {
        Self {
            id: Uuid::new(),
            title: title.into(),
            author: author.into(),
            genre: genre.into(),
            published_year,
            price,
            in_stock,
        }
    }

    /// Checks the invariants the store cannot express.
    pub fn validate(&self) -> CatalogResult<()> {
        validate_price(self.price)
            .map_err(|e| CatalogError::InvalidArgument(format!("book {:?}: {e}", self.title)))
    }
}

pub(crate) fn validate_price(price: f64) -> CatalogResult<()> {
    if !price.is_finite() {
        return Err(CatalogError::InvalidArgument(format!("price must be finite, got {price}")));
    }
    if price < 0.0 {
        return Err(CatalogError::InvalidArgument(format!("price must not be negative, got {price}")));
    }

    Ok(())
}

/// Title, author and price of a book, without its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSummary {
    pub title: String,
    pub author: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorCount {
    pub author: String,
    pub count: u64,
}

/// Number of books published in one decade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecadeCount {
    /// First year of the decade, e.g. `1980`.
    pub decade: i64,
    pub count: u64,
}

impl DecadeCount {
    /// Display label, e.g. `"1980s"`.
    pub fn label(&self) -> String {
        format!("{}s", self.decade)
    }
}
