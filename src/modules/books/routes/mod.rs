use axum::{routing::get, Router};

use super::handlers::{self, SharedStore};

/// Route table for the books module.
///
/// `GET /book` and `GET /books` are aliases of the same listing.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/book", get(handlers::list_books).post(handlers::create_book))
        .route("/books", get(handlers::list_books))
        .route(
            "/book/{bookId}",
            get(handlers::get_book)
                .put(handlers::update_book)
                .delete(handlers::delete_book),
        )
        .with_state(store)
}
