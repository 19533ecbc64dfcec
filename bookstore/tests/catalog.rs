mod common;

use bookstore::{
    Book, BookSummary, CatalogError, DecadeCount,
    bson::Uuid,
    memory::InMemoryStore,
    query::{Filter, Query, SortDirection},
    store::DocumentStore,
    update::UpdateOutcome,
};
use common::{bookshelf, books_from, catalog_with, titles};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn find_by_genre_matches_exactly() {
    let catalog = catalog_with(bookshelf()).await;

    let fiction = catalog.find_by_genre("Fiction").await.unwrap();
    assert_eq!(
        titles(&fiction),
        vec!["To Kill a Mockingbird", "The Great Gatsby", "The Catcher in the Rye", "The Alchemist"]
    );

    assert!(catalog.find_by_genre("fiction").await.unwrap().is_empty());
    assert!(catalog.find_by_genre("Horror").await.unwrap().is_empty());
}

#[tokio::test]
async fn published_after_is_strict() {
    let catalog = catalog_with(bookshelf()).await;

    let recent = catalog.find_published_after(1951).await.unwrap();
    assert_eq!(titles(&recent), vec!["To Kill a Mockingbird", "The Lord of the Rings", "The Alchemist"]);
    assert!(recent.iter().all(|book| book.published_year > 1951));

    assert!(catalog.find_published_after(1988).await.unwrap().is_empty());
}

#[tokio::test]
async fn find_by_author() {
    let catalog = catalog_with(bookshelf()).await;

    let orwell = catalog.find_by_author("George Orwell").await.unwrap();
    assert_eq!(titles(&orwell), vec!["1984", "Animal Farm"]);
}

#[tokio::test]
async fn in_stock_after_year_needs_both_conditions() {
    let catalog = catalog_with(bookshelf()).await;

    let books = catalog.find_in_stock_after_year(1940).await.unwrap();
    assert_eq!(
        titles(&books),
        vec!["To Kill a Mockingbird", "1984", "The Catcher in the Rye", "The Lord of the Rings", "The Alchemist"]
    );
    assert!(books.iter().all(|book| book.in_stock && book.published_year > 1940));
}

#[tokio::test]
async fn updated_price_is_visible_to_later_queries() {
    let catalog = catalog_with(bookshelf()).await;

    let outcome = catalog.update_book_price("1984", 19.99).await.unwrap();
    assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });

    let orwell = catalog.find_by_author("George Orwell").await.unwrap();
    let nineteen_eighty_four = orwell.iter().find(|book| book.title == "1984").unwrap();
    assert_eq!(nineteen_eighty_four.price, 19.99);

    let animal_farm = orwell.iter().find(|book| book.title == "Animal Farm").unwrap();
    assert_eq!(animal_farm.price, 8.5);
}

#[tokio::test]
async fn update_of_missing_title_is_not_an_error() {
    let catalog = catalog_with(bookshelf()).await;

    let outcome = catalog.update_book_price("Dune", 9.99).await.unwrap();
    assert_eq!(outcome, UpdateOutcome { matched: 0, modified: 0 });
    assert_eq!(catalog.count().await.unwrap(), 12);
}

#[tokio::test]
async fn update_touches_only_the_first_duplicate() {
    let catalog = catalog_with(json!([
        { "title": "1984", "author": "George Orwell", "genre": "Dystopian", "published_year": 1949, "price": 10.99, "in_stock": true },
        { "title": "1984", "author": "George Orwell", "genre": "Dystopian", "published_year": 1949, "price": 4.5, "in_stock": false },
    ]))
    .await;

    catalog.update_book_price("1984", 19.99).await.unwrap();

    let prices: Vec<f64> = catalog
        .find_by_author("George Orwell")
        .await
        .unwrap()
        .iter()
        .map(|book| book.price)
        .collect();
    assert_eq!(prices, vec![19.99, 4.5]);
}

#[tokio::test]
async fn invalid_prices_leave_the_store_untouched() {
    let catalog = catalog_with(bookshelf()).await;

    for price in [-1.0, f64::NAN, f64::INFINITY] {
        let result = catalog.update_book_price("1984", price).await;
        assert!(matches!(result, Err(CatalogError::InvalidArgument(_))));
    }

    let orwell = catalog.find_by_author("George Orwell").await.unwrap();
    assert_eq!(orwell[0].price, 10.99);
}

#[tokio::test]
async fn invalid_books_are_never_inserted() {
    let catalog = catalog_with(json!([])).await;

    let mut books = books_from(bookshelf());
    books[3].price = -5.0;

    assert!(matches!(catalog.insert_books(books).await, Err(CatalogError::InvalidArgument(_))));
    assert_eq!(catalog.count().await.unwrap(), 0);
}

#[tokio::test]
async fn deleting_an_absent_title_changes_nothing() {
    let catalog = catalog_with(json!([
        { "title": "1984", "author": "George Orwell", "genre": "Dystopian", "published_year": 1949, "price": 10.99, "in_stock": true },
        { "title": "The Hobbit", "author": "J.R.R. Tolkien", "genre": "Fantasy", "published_year": 1937, "price": 14.99, "in_stock": true },
    ]))
    .await;

    let outcome = catalog.delete_book_by_title("Moby Dick").await.unwrap();
    assert_eq!(outcome.deleted, 0);
    assert_eq!(catalog.count().await.unwrap(), 2);
}

#[tokio::test]
async fn delete_removes_one_book() {
    let catalog = catalog_with(bookshelf()).await;

    let outcome = catalog.delete_book_by_title("Moby Dick").await.unwrap();
    assert_eq!(outcome.deleted, 1);
    assert_eq!(catalog.count().await.unwrap(), 11);
    assert!(catalog.find_by_genre("Adventure").await.unwrap().is_empty());
}

#[tokio::test]
async fn summaries_hold_only_title_author_and_price() {
    let catalog = catalog_with(bookshelf()).await;

    let summaries = catalog.project_summary().await.unwrap();
    assert_eq!(summaries.len(), 12);
    assert_eq!(
        summaries[1],
        BookSummary { title: "1984".into(), author: "George Orwell".into(), price: 10.99 }
    );
}

#[tokio::test]
async fn price_sort_keeps_insertion_order_for_ties() {
    let catalog = catalog_with(bookshelf()).await;

    let ascending = catalog.sort_by_price(SortDirection::Asc).await.unwrap();
    assert_eq!(
        titles(&ascending),
        vec![
            "Pride and Prejudice",
            "Animal Farm",
            "The Catcher in the Rye",
            "The Great Gatsby",
            "Wuthering Heights",
            "1984",
            "The Alchemist",
            "Brave New World",
            "Moby Dick",
            "To Kill a Mockingbird",
            "The Hobbit",
            "The Lord of the Rings",
        ]
    );

    let descending = catalog.sort_by_price(SortDirection::Desc).await.unwrap();
    assert_eq!(descending[0].title, "The Lord of the Rings");
    assert!(descending.windows(2).all(|pair| pair[0].price >= pair[1].price));

    let gatsby = titles(&descending).iter().position(|title| *title == "The Great Gatsby");
    let wuthering = titles(&descending).iter().position(|title| *title == "Wuthering Heights");
    assert!(gatsby < wuthering);
}

#[tokio::test]
async fn pages_reconstruct_natural_order() {
    let catalog = catalog_with(bookshelf()).await;
    let all = books_from(bookshelf());

    let first = catalog.paginate(1).await.unwrap();
    assert_eq!(first.items.len(), 5);
    assert_eq!(first.count, 12);
    assert_eq!(first.next_page, Some(2));
    assert_eq!(first.previous_page, None);

    let mut seen = Vec::new();
    for page in 1..=3 {
        let page = catalog.paginate(page).await.unwrap();
        seen.extend(page.items.into_iter().map(|book| book.title));
    }
    let expected: Vec<String> = all.into_iter().map(|book| book.title).collect();
    assert_eq!(seen, expected);

    let last = catalog.paginate(3).await.unwrap();
    assert_eq!(last.items.len(), 2);
    assert_eq!(last.next_page, None);

    let past_the_end = catalog.paginate(4).await.unwrap();
    assert!(past_the_end.is_empty());
}

#[tokio::test]
async fn explicit_page_sizes() {
    let catalog = catalog_with(bookshelf()).await;

    let page = catalog.paginate_with(2, 4).await.unwrap();
    assert_eq!(titles(&page.items), vec!["The Hobbit", "The Catcher in the Rye", "Pride and Prejudice", "The Lord of the Rings"]);

    let everything = catalog.paginate_with(1, 100).await.unwrap();
    assert_eq!(everything.items.len(), 12);
}

#[tokio::test]
async fn page_zero_and_size_zero_are_rejected() {
    let catalog = catalog_with(bookshelf()).await;

    assert!(matches!(catalog.paginate(0).await, Err(CatalogError::InvalidArgument(_))));
    assert!(matches!(catalog.paginate_with(1, 0).await, Err(CatalogError::InvalidArgument(_))));
}

#[tokio::test]
async fn average_price_by_genre() {
    let catalog = catalog_with(json!([
        { "title": "1984", "author": "George Orwell", "genre": "Dystopian", "published_year": 1949, "price": 15, "in_stock": true },
        { "title": "Brave New World", "author": "Aldous Huxley", "genre": "Dystopian", "published_year": 1932, "price": 25, "in_stock": true },
        { "title": "The Hobbit", "author": "J.R.R. Tolkien", "genre": "Fantasy", "published_year": 1937, "price": 14.5, "in_stock": true },
    ]))
    .await;

    let averages = catalog.average_price_by_genre().await.unwrap();
    assert_eq!(averages.len(), 2);
    assert_eq!(averages["Dystopian"], 20.0);
    assert_eq!(averages["Fantasy"], 14.5);
}

#[tokio::test]
async fn most_prolific_author_breaks_ties_alphabetically() {
    let catalog = catalog_with(bookshelf()).await;

    // George Orwell and J.R.R. Tolkien both have two books
    let top = catalog.author_with_most_books().await.unwrap().unwrap();
    assert_eq!(top.author, "George Orwell");
    assert_eq!(top.count, 2);
}

#[tokio::test]
async fn empty_collections_have_no_top_author() {
    let catalog = catalog_with(json!([])).await;

    assert_eq!(catalog.author_with_most_books().await.unwrap(), None);
    assert!(catalog.average_price_by_genre().await.unwrap().is_empty());
    assert!(catalog.count_by_decade().await.unwrap().is_empty());
}

#[tokio::test]
async fn decades_are_counted_and_labelled() {
    let catalog = catalog_with(json!([
        { "title": "A", "author": "X", "genre": "Fiction", "published_year": 1975, "price": 1.0, "in_stock": true },
        { "title": "B", "author": "Y", "genre": "Fiction", "published_year": 1983, "price": 1.0, "in_stock": true },
        { "title": "C", "author": "Z", "genre": "Fiction", "published_year": 1991, "price": 1.0, "in_stock": true },
    ]))
    .await;

    let decades = catalog.count_by_decade().await.unwrap();
    let labelled: Vec<(String, u64)> = decades.iter().map(|d| (d.label(), d.count)).collect();

    assert_eq!(
        labelled,
        vec![("1970s".to_string(), 1), ("1980s".to_string(), 1), ("1990s".to_string(), 1)]
    );
}

#[tokio::test]
async fn decades_sort_numerically() {
    let catalog = catalog_with(bookshelf()).await;

    let decades = catalog.count_by_decade().await.unwrap();
    assert_eq!(
        decades,
        vec![
            DecadeCount { decade: 1810, count: 1 },
            DecadeCount { decade: 1840, count: 1 },
            DecadeCount { decade: 1850, count: 1 },
            DecadeCount { decade: 1920, count: 1 },
            DecadeCount { decade: 1930, count: 2 },
            DecadeCount { decade: 1940, count: 2 },
            DecadeCount { decade: 1950, count: 2 },
            DecadeCount { decade: 1960, count: 1 },
            DecadeCount { decade: 1980, count: 1 },
        ]
    );
}

#[tokio::test]
async fn collections_are_isolated() {
    let catalog = catalog_with(bookshelf()).await;
    assert_eq!(catalog.collection(), "books");

    let other = bookstore::BookCatalog::new(DocumentStore::new(InMemoryStore::new())).with_collection("archive");
    assert_eq!(other.count().await.unwrap(), 0);
}

#[tokio::test]
async fn identifier_lookups_match_exactly() {
    let store = DocumentStore::new(InMemoryStore::new());
    let books = store.typed_collection::<Book>();
    assert_eq!(books.name(), "books");

    let shelf = books_from(bookshelf());
    let first = shelf[0].clone();
    books.insert(shelf).await.unwrap();

    let found = books.query(Query::filtered(Filter::eq("id", first.id.clone()))).await.unwrap();
    assert_eq!(found, vec![first]);

    assert_eq!(books.count(Some(Filter::eq("id", Uuid::new()))).await.unwrap(), 0);
    assert_eq!(books.count(Some(Filter::ne("id", Uuid::new()))).await.unwrap(), 12);
}
