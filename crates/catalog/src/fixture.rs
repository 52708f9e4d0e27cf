//! Seeded in-memory catalog shared by the unit tests.
//!
//! | book | categories | tags | authors | publishers | translators |
//! |------|------------|------|---------|------------|-------------|
//! | 100  | 1, 2       | 9    | 7       | 20         | 30          |
//! | 101  | 1          | 10   | 7       | 21         | 30          |
//! | 102  | 1, 5       | 10   | 8       | 21         | 30, 31      |
//! | 103  | 1, 5       | 10   | 12      | 22         | 31          |
//! | 42   | 1          | 11   | 13      | 22         |             |
//!
//! Category 3 exists but has no books.

use crate::catalog::{Catalog, Stores};
use crate::db::Database;
use folio_config::QueryConfig;
use folio_store::Store;
use folio_store::backend::MockStore;
use std::sync::Arc;

const CATALOG: &str = r#"
    INSERT INTO books (id, title, modified_at) VALUES
        (42, 'The Hitchhiker''s Guide to the Galaxy', 1000),
        (100, 'The Dispossessed', 1000),
        (101, 'The Left Hand of Darkness', 2000),
        (102, 'Solaris', 3000),
        (103, 'Roadside Picnic', 4000);
    INSERT INTO categories (id, name, modified_at) VALUES
        (1, 'Science Fiction', 1000),
        (2, 'Utopian Fiction', 2000),
        (3, 'Poetry', 3000),
        (5, 'Translated', 5000);
    INSERT INTO tags (id, name, modified_at) VALUES
        (9, 'anarchism', 1000),
        (10, 'first contact', 4000),
        (11, 'comedy', 1000);
    INSERT INTO authors (id, name, modified_at) VALUES
        (7, 'Ursula K. Le Guin', 1000),
        (8, 'Stanisław Lem', 4000),
        (12, 'Arkady and Boris Strugatsky', 1000),
        (13, 'Douglas Adams', 1000);
    INSERT INTO publishers (id, name, modified_at) VALUES
        (20, 'Harper & Row', 1000),
        (21, 'Ace Books', 4000),
        (22, 'Pan Books', 1000);
    INSERT INTO translators (id, name, modified_at) VALUES
        (30, 'Joanna Kilmartin', 1000),
        (31, 'Antonina W. Bouis', 4000);
    INSERT INTO book_categories (book_id, category_id) VALUES
        (100, 1), (100, 2), (101, 1), (102, 1), (102, 5), (103, 1), (103, 5), (42, 1);
    INSERT INTO book_tags (book_id, tag_id) VALUES
        (100, 9), (101, 10), (102, 10), (103, 10), (42, 11);
    INSERT INTO book_authors (book_id, author_id) VALUES
        (100, 7), (101, 7), (102, 8), (103, 12), (42, 13);
    INSERT INTO book_publishers (book_id, publisher_id) VALUES
        (100, 20), (101, 21), (102, 21), (103, 22), (42, 22);
    INSERT INTO book_translators (book_id, translator_id) VALUES
        (100, 30), (101, 30), (102, 30), (102, 31), (103, 31);
    INSERT INTO reviews (id, book_id, rating, body, modified_at) VALUES
        (1, 100, 5, 'Ambiguous, and all the better for it.', 1000),
        (2, 100, 4, NULL, 2000);
"#;

const METADATA: &str = r#"
    INSERT INTO book_metadata (book_id, key, value) VALUES
        (100, 'pages', '387'),
        (100, 'isbn', '978-0-06-051275-3');
"#;

pub(crate) async fn seeded() -> Database {
    let db = Database::connect_in_memory().await.unwrap();
    sqlx::raw_sql(CATALOG).execute(db.catalog.pool()).await.unwrap();
    sqlx::raw_sql(METADATA).execute(db.metadata.pool()).await.unwrap();
    db
}

pub(crate) async fn catalog() -> Catalog {
    Catalog::from(&seeded().await)
}

/// A seeded catalog whose catalog store is wrapped in a [`MockStore`].
pub(crate) async fn mocked(options: QueryConfig) -> (Catalog, MockStore) {
    let db = seeded().await;
    let mock = MockStore::new(Arc::new(db.catalog.clone()));
    let stores = Stores {
        catalog: Arc::new(mock.clone()),
        metadata: Arc::new(db.metadata.clone()),
    };
    assert_eq!(mock.name(), "catalog");
    (Catalog::new(stores, options), mock)
}
