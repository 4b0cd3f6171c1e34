//! One handler per book operation.
//!
//! Every handler runs its checks in a fixed order (identifier, existence,
//! body, storage) and the first failure decides the response.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    Json,
};
use bookstore_http::AppError;

use super::models::{Book, BookId, DecodeError, DeletedBook};
use super::store::{BookStore, StoreError};

pub const INVALID_BOOK_ID: &str = "Invalid book ID";
pub const INVALID_JSON: &str = "Invalid JSON format";
pub const BOOK_NOT_FOUND: &str = "Book not found";
pub const UPDATE_FAILED: &str = "Failed to update book";
pub const BOOK_DELETED: &str = "Book deleted successfully";

/// Store handle shared by every handler
pub type SharedStore = Arc<dyn BookStore>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::not_found(BOOK_NOT_FOUND),
            StoreError::Database(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        tracing::debug!(error = %err, "rejecting book payload");
        AppError::bad_request(INVALID_JSON)
    }
}

/// Parse a path segment as a book id: plain decimal digits within `u32`.
pub fn parse_book_id(raw: &str) -> Result<BookId, AppError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::bad_request(INVALID_BOOK_ID));
    }
    raw.parse()
        .map_err(|_| AppError::bad_request(INVALID_BOOK_ID))
}

/// `{bookId}` path segment parsed with [`parse_book_id`].
///
/// Segments that do not percent-decode to UTF-8 are rejected with the same
/// JSON error as any other malformed id.
#[derive(Debug, Clone, Copy)]
pub struct BookIdParam(pub BookId);

impl<S> FromRequestParts<S> for BookIdParam
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::debug!(error = %rejection, "rejecting book id segment");
                AppError::bad_request(INVALID_BOOK_ID)
            })?;
        parse_book_id(&raw).map(Self)
    }
}

pub async fn list_books(State(store): State<SharedStore>) -> Result<Json<Vec<Book>>, AppError> {
    let books = store.find_all().await?;
    Ok(Json(books))
}

pub async fn get_book(
    State(store): State<SharedStore>,
    BookIdParam(id): BookIdParam,
) -> Result<Json<Book>, AppError> {
    let book = store.find_by_id(id).await?;
    Ok(Json(book))
}

pub async fn create_book(
    State(store): State<SharedStore>,
    body: Bytes,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let book = Book::decode(&body)?;
    let created = store.create(book).await?;

    tracing::info!(book_id = created.id, "book created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Full replacement: fields missing from the body are cleared, while the
/// stored `id` and `created_at` always win over the payload.
pub async fn update_book(
    State(store): State<SharedStore>,
    BookIdParam(id): BookIdParam,
    body: Bytes,
) -> Result<Json<Book>, AppError> {
    let existing = store.find_by_id(id).await?;

    let mut book = Book::decode(&body)?;
    book.id = existing.id;
    book.created_at = existing.created_at;

    let updated = store
        .update(book)
        .await
        .map_err(|e| AppError::server(UPDATE_FAILED, e))?;

    tracing::info!(book_id = updated.id, "book updated");
    Ok(Json(updated))
}

pub async fn delete_book(
    State(store): State<SharedStore>,
    BookIdParam(id): BookIdParam,
) -> Result<Json<DeletedBook>, AppError> {
    store.find_by_id(id).await?;

    let book = store.delete(id).await?;

    tracing::info!(book_id = id, "book deleted");
    Ok(Json(DeletedBook {
        message: BOOK_DELETED.to_string(),
        book,
    }))
}
