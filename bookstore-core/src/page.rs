//! Pagination and result page types.
//!
//! [`PaginationParams`] turns a 1-indexed page number and page size into an
//! offset/limit pair; [`Page`] carries one page of results plus navigation metadata.

use serde::{Deserialize, Serialize};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A single page of paginated results.
///
/// ```ignore
/// use bookstore_core::page::Page;
///
/// let page: Page<String> = Page::builder(vec!["item1".to_string()])
///     .with_count(12)
///     .with_next_page(Some(2))
///     .build();
///
/// assert_eq!(page.items.len(), 1);
/// assert_eq!(page.count, 12);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items contained in this page.
    pub items: Vec<T>,
    /// Total count of items across all pages.
    pub count: usize,
    /// The next page number (if more pages exist).
    pub next_page: Option<usize>,
    /// The previous page number (if this is not the first page).
    pub previous_page: Option<usize>,
}

impl<T> Page<T> {
    /// Creates a new builder for constructing a page.
    pub fn builder(items: Vec<T>) -> PageBuilder<T> {
        PageBuilder::new(items)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builder for [`Page`].
pub struct PageBuilder<T> {
    items: Vec<T>,
    count: usize,
    next_page: Option<usize>,
    previous_page: Option<usize>,
}

impl<T> PageBuilder<T> {
    /// Creates a new builder with the given items.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            count: 0,
            next_page: None,
            previous_page: None,
        }
    }

    /// Sets the total count of items across all pages.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Sets the next page number (or `None` if this is the last page).
    pub fn with_next_page(mut self, next_page: Option<usize>) -> Self {
        self.next_page = next_page;
        self
    }

    /// Sets the previous page number (or `None` if this is the first page).
    pub fn with_previous_page(mut self, previous_page: Option<usize>) -> Self {
        self.previous_page = previous_page;
        self
    }

    /// Builds and returns the final [`Page`] instance.
    pub fn build(self) -> Page<T> {
        Page {
            items: self.items,
            count: self.count,
            next_page: self.next_page,
            previous_page: self.previous_page,
        }
    }
}

/// Which page to retrieve and how many items per page.
///
/// Pages are 1-indexed: page 1 skips nothing, page `p` skips `(p - 1) * per_page`.
///
/// ```ignore
/// use bookstore_core::page::PaginationParams;
///
/// let params = PaginationParams::new(2, 5)?;
/// assert_eq!(params.offset(), 5);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PaginationParams {
    /// The page number (1-indexed).
    pub page: usize,
    /// Number of items per page.
    pub per_page: usize,
}

impl PaginationParams {
    /// Creates pagination parameters, rejecting a zero page number or page size.
    pub fn new(page: usize, per_page: usize) -> DocumentStoreResult<Self> {
        if page == 0 {
            return Err(DocumentStoreError::InvalidQuery("page numbers start at 1".into()));
        }
        if per_page == 0 {
            return Err(DocumentStoreError::InvalidQuery("page size must be positive".into()));
        }

        Ok(Self { page, per_page })
    }

    /// Number of items to skip for this page.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Wraps the items fetched for this page, given the total item count.
    pub fn page_of<T>(&self, items: Vec<T>, total: usize) -> Page<T> {
        let end = self.offset().saturating_add(items.len());

        Page::builder(items)
            .with_count(total)
            .with_next_page(if end < total { Some(self.page + 1) } else { None })
            .with_previous_page(if self.page > 1 { Some(self.page - 1) } else { None })
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn offset_is_one_indexed() {
        assert_eq!(PaginationParams::new(1, 5).unwrap().offset(), 0);
        assert_eq!(PaginationParams::new(2, 5).unwrap().offset(), 5);
        assert_eq!(PaginationParams::new(3, 20).unwrap().offset(), 40);
    }

    #[test]
    fn zero_page_or_size_is_rejected() {
        assert!(matches!(PaginationParams::new(0, 5), Err(DocumentStoreError::InvalidQuery(_))));
        assert!(matches!(PaginationParams::new(1, 0), Err(DocumentStoreError::InvalidQuery(_))));
    }

    #[test]
    fn page_metadata_tracks_neighbours() {
        let params = PaginationParams::new(2, 5).unwrap();

        let middle = params.page_of(vec![6, 7, 8, 9, 10], 12);
        assert_eq!(middle.next_page, Some(3));
        assert_eq!(middle.previous_page, Some(1));
        assert_eq!(middle.count, 12);

        let last = PaginationParams::new(3, 5).unwrap().page_of(vec![11, 12], 12);
        assert_eq!(last.next_page, None);
        assert_eq!(last.previous_page, Some(2));

        let beyond = PaginationParams::new(9, 5).unwrap().page_of(Vec::<i32>::new(), 12);
        assert!(beyond.is_empty());
        assert_eq!(beyond.next_page, None);
    }
}
