#![allow(dead_code)]

use bookstore::{
    Book, BookCatalog,
    document::DocumentExt,
    memory::InMemoryStore,
    store::DocumentStore,
};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn books_from(fixtures: Value) -> Vec<Book> {
    fixtures
        .as_array()
        .expect("fixtures must be a JSON array")
        .iter()
        .cloned()
        .map(|value| Book::from_json(value).expect("valid book fixture"))
        .collect()
}

pub async fn catalog_with(fixtures: Value) -> BookCatalog<InMemoryStore> {
    init_tracing();

    let catalog = BookCatalog::new(DocumentStore::new(InMemoryStore::new()));
    catalog.insert_books(books_from(fixtures)).await.unwrap();
    catalog
}

/// Twelve books in a fixed insertion order.
pub fn bookshelf() -> Value {
    json!([
        { "title": "To Kill a Mockingbird", "author": "Harper Lee", "genre": "Fiction", "published_year": 1960, "price": 12.99, "in_stock": true },
        { "title": "1984", "author": "George Orwell", "genre": "Dystopian", "published_year": 1949, "price": 10.99, "in_stock": true },
        { "title": "The Great Gatsby", "author": "F. Scott Fitzgerald", "genre": "Fiction", "published_year": 1925, "price": 9.99, "in_stock": true },
        { "title": "Brave New World", "author": "Aldous Huxley", "genre": "Dystopian", "published_year": 1932, "price": 11.5, "in_stock": false },
        { "title": "The Hobbit", "author": "J.R.R. Tolkien", "genre": "Fantasy", "published_year": 1937, "price": 14.99, "in_stock": true },
        { "title": "The Catcher in the Rye", "author": "J.D. Salinger", "genre": "Fiction", "published_year": 1951, "price": 8.99, "in_stock": true },
        { "title": "Pride and Prejudice", "author": "Jane Austen", "genre": "Romance", "published_year": 1813, "price": 7.99, "in_stock": true },
        { "title": "The Lord of the Rings", "author": "J.R.R. Tolkien", "genre": "Fantasy", "published_year": 1954, "price": 19.99, "in_stock": true },
        { "title": "Animal Farm", "author": "George Orwell", "genre": "Political Satire", "published_year": 1945, "price": 8.5, "in_stock": false },
        { "title": "The Alchemist", "author": "Paulo Coelho", "genre": "Fiction", "published_year": 1988, "price": 10.99, "in_stock": true },
        { "title": "Moby Dick", "author": "Herman Melville", "genre": "Adventure", "published_year": 1851, "price": 12.5, "in_stock": false },
        { "title": "Wuthering Heights", "author": "Emily Brontë", "genre": "Gothic Fiction", "published_year": 1847, "price": 9.99, "in_stock": true },
    ])
}

pub fn titles(books: &[Book]) -> Vec<&str> {
    books.iter().map(|book| book.title.as_str()).collect()
}
