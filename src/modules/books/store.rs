//! Persistence gateway for books.
//!
//! [`BookStore`] is the seam handlers talk to; [`SqlBookStore`] implements it
//! over a SQLite pool built during bootstrap. Each call is atomic on its own
//! row and there are no cross-call transactions.

use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;
use time::OffsetDateTime;

use bookstore_kernel::Migration;

use super::models::{Book, BookId};

/// Schema for the `books` table.
///
/// `AUTOINCREMENT` keeps identifiers of deleted rows from being handed out again.
pub const CREATE_BOOKS_TABLE: Migration = Migration {
    id: "001_create_books",
    up: r#"
        CREATE TABLE IF NOT EXISTS books (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            title            TEXT NOT NULL,
            author           TEXT NOT NULL,
            isbn             TEXT NOT NULL,
            publication_year TEXT NOT NULL,
            genre            TEXT,
            price            REAL,
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        );
    "#,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("book {0} not found")]
    NotFound(BookId),

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait BookStore: Send + Sync {
    /// Persist a new book; id and timestamps in `book` are ignored and assigned here
    async fn create(&self, book: Book) -> Result<Book, StoreError>;

    /// Every stored book in storage order
    async fn find_all(&self) -> Result<Vec<Book>, StoreError>;

    async fn find_by_id(&self, id: BookId) -> Result<Book, StoreError>;

    /// Overwrite every column of the row `book.id` and refresh `updated_at`.
    ///
    /// The caller reconciles `id` and `created_at` with the stored row first.
    async fn update(&self, book: Book) -> Result<Book, StoreError>;

    /// Remove a row and return it as it was before deletion.
    ///
    /// An unknown id deletes nothing and yields an empty book; callers check
    /// existence beforehand.
    async fn delete(&self, id: BookId) -> Result<Book, StoreError>;
}

pub struct SqlBookStore {
    pool: SqlitePool,
}

impl SqlBookStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for SqlBookStore {
    #[tracing::instrument(skip(self, book), fields(title = %book.title))]
    async fn create(&self, book: Book) -> Result<Book, StoreError> {
        let now = OffsetDateTime::now_utc();

        let created: Book = sqlx::query_as(
            r#"
            INSERT INTO books (title, author, isbn, publication_year, genre, price, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publication_year)
        .bind(&book.genre)
        .bind(book.price)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(book_id = created.id, "book created");
        Ok(created)
    }

    #[tracing::instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<Book>, StoreError> {
        let books = sqlx::query_as("SELECT * FROM books ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: BookId) -> Result<Book, StoreError> {
        sqlx::query_as("SELECT * FROM books WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    #[tracing::instrument(skip(self, book), fields(book_id = book.id))]
    async fn update(&self, book: Book) -> Result<Book, StoreError> {
        let updated: Option<Book> = sqlx::query_as(
            r#"
            UPDATE books
            SET title = ?, author = ?, isbn = ?, publication_year = ?,
                genre = ?, price = ?, created_at = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publication_year)
        .bind(&book.genre)
        .bind(book.price)
        .bind(book.created_at)
        .bind(OffsetDateTime::now_utc())
        .bind(book.id)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(StoreError::NotFound(book.id))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: BookId) -> Result<Book, StoreError> {
        let mut tx = self.pool.begin().await?;

        let snapshot: Option<Book> = sqlx::query_as("SELECT * FROM books WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(snapshot.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqlBookStore {
        let pool = bookstore_db::connect_in_memory().await.unwrap();
        bookstore_db::apply_migrations(&pool, &[("books".to_string(), CREATE_BOOKS_TABLE)])
            .await
            .unwrap();
        SqlBookStore::new(pool)
    }

    fn book(title: &str) -> Book {
        Book {
            title: title.to_string(),
            author: "Ursula K. Le Guin".to_string(),
            isbn: "9780441478125".to_string(),
            publication_year: "1969".to_string(),
            genre: Some("Science Fiction".to_string()),
            price: Some(9.99),
            ..Book::default()
        }
    }

    #[tokio::test]
    async fn create_assigns_identity_and_timestamps() {
        let store = store().await;

        let mut input = book("The Left Hand of Darkness");
        input.id = 4242;

        let created = store.create(input).await.unwrap();

        assert!(created.id > 0);
        assert_ne!(created.id, 4242);
        assert_eq!(created.title, "The Left Hand of Darkness");
        assert_eq!(created.price, Some(9.99));
        assert!(created.created_at > OffsetDateTime::UNIX_EPOCH);
        assert_eq!(created.created_at, created.updated_at);
    }

    #[tokio::test]
    async fn find_by_id_reports_missing_rows() {
        let store = store().await;

        let err = store.find_by_id(99999).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(99999)));
    }

    #[tokio::test]
    async fn find_all_returns_every_row() {
        let store = store().await;
        assert!(store.find_all().await.unwrap().is_empty());

        let a = store.create(book("A")).await.unwrap();
        let b = store.create(book("B")).await.unwrap();

        let ids: Vec<BookId> = store.find_all().await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn update_replaces_fields_and_refreshes_updated_at() {
        let store = store().await;
        let created = store.create(book("Old")).await.unwrap();

        let replacement = Book {
            id: created.id,
            title: "New".to_string(),
            created_at: created.created_at,
            ..Book::default()
        };

        let updated = store.update(replacement).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "New");
        assert_eq!(updated.author, "");
        assert_eq!(updated.genre, None);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(store.find_by_id(created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn delete_returns_snapshot_and_removes_row() {
        let store = store().await;
        let created = store.create(book("Gone")).await.unwrap();

        let deleted = store.delete(created.id).await.unwrap();

        assert_eq!(deleted, created);
        assert!(matches!(
            store.find_by_id(created.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_of_unknown_id_yields_empty_book() {
        let store = store().await;
        assert_eq!(store.delete(77).await.unwrap(), Book::default());
    }

    #[tokio::test]
    async fn identifiers_are_not_reused_after_delete() {
        let store = store().await;
        let first = store.create(book("First")).await.unwrap();
        store.delete(first.id).await.unwrap();

        let second = store.create(book("Second")).await.unwrap();
        assert!(second.id > first.id);
    }
}
