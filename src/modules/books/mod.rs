pub mod handlers;
pub mod models;
pub mod routes;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookstore_kernel::{InitCtx, Migration, Module};
use serde_json::json;
use sqlx::SqlitePool;

use handlers::SharedStore;
use store::SqlBookStore;

/// Books module: CRUD over the `books` table
pub struct BooksModule {
    store: SharedStore,
}

impl BooksModule {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(Arc::clone(&self.store))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![store::CREATE_BOOKS_TABLE]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module backed by the given pool
pub fn create_module(pool: SqlitePool) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(Arc::new(SqlBookStore::new(pool))))
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let book_id = json!({
        "name": "bookId",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int32", "minimum": 0 }
    });
    let book_body = json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    });
    let list = json!({
        "get": {
            "summary": "List books",
            "tags": ["Books"],
            "responses": {
                "200": {
                    "description": "Every stored book",
                    "content": {
                        "application/json": {
                            "schema": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Book" }
                            }
                        }
                    }
                },
                "500": error_response("Storage failure")
            }
        }
    });

    let mut book_collection = list.clone();
    book_collection["post"] = json!({
        "summary": "Create a book",
        "tags": ["Books"],
        "requestBody": book_body.clone(),
        "responses": {
            "201": book_response("Created book"),
            "400": error_response("Invalid JSON format"),
            "500": error_response("Storage failure")
        }
    });

    json!({
        "paths": {
            "/book": book_collection,
            "/books": list,
            "/book/{bookId}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [book_id.clone()],
                    "responses": {
                        "200": book_response("The book"),
                        "400": error_response("Invalid book ID"),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Replace a book",
                    "tags": ["Books"],
                    "parameters": [book_id.clone()],
                    "requestBody": book_body,
                    "responses": {
                        "200": book_response("Updated book"),
                        "400": error_response("Invalid book ID or JSON format"),
                        "404": error_response("Book not found"),
                        "500": error_response("Failed to update book")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [book_id],
                    "responses": {
                        "200": {
                            "description": "Deleted book snapshot",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "message": { "type": "string" },
                                            "book": { "$ref": "#/components/schemas/Book" }
                                        },
                                        "required": ["message", "book"]
                                    }
                                }
                            }
                        },
                        "400": error_response("Invalid book ID"),
                        "404": error_response("Book not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int32", "readOnly": true },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "isbn": { "type": "string" },
                        "publication_year": { "type": "string" },
                        "genre": { "type": ["string", "null"] },
                        "price": { "type": ["number", "null"] },
                        "created_at": { "type": "string", "format": "date-time", "readOnly": true },
                        "updated_at": { "type": "string", "format": "date-time", "readOnly": true }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_fragment_documents_every_route() {
        let fragment = openapi_fragment();
        let paths = fragment["paths"].as_object().unwrap();

        assert!(paths["/book"].get("get").is_some());
        assert!(paths["/book"].get("post").is_some());
        assert!(paths["/books"].get("get").is_some());
        for method in ["get", "put", "delete"] {
            assert!(paths["/book/{bookId}"].get(method).is_some(), "{method}");
        }
    }
}
