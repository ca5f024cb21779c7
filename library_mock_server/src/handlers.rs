use std::sync::Arc;

use actix_web::web::{self, Data};
use actix_web::{Error, HttpResponse};
use serde_json::json;

use library_catalog::api::{ApiResponse, BookDraft, BorrowRequest, ListBooksParams};

use crate::library_store::{LibraryStore, LibraryStoreError};

pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

pub async fn get_all_books(
    library_store: Data<Arc<dyn LibraryStore>>,
    params: web::Query<ListBooksParams>,
) -> Result<HttpResponse, Error> {
    Ok(match library_store.list_books(&params).await {
        Ok(books) => {
            HttpResponse::Ok().json(ApiResponse::ok("Books retrieved successfully", Some(books)))
        }
        Err(err) => error_response("Get all books", err),
    })
}

pub async fn add_book(
    library_store: Data<Arc<dyn LibraryStore>>,
    draft: web::Json<BookDraft>,
) -> Result<HttpResponse, Error> {
    Ok(match library_store.add_book(draft.into_inner()).await {
        Ok(book) => {
            HttpResponse::Created().json(ApiResponse::ok("Book created successfully", Some(book)))
        }
        Err(err) => error_response("Add book", err),
    })
}

pub async fn get_book(
    library_store: Data<Arc<dyn LibraryStore>>,
    book_id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(match library_store.get_book(&book_id).await {
        Ok(book) => {
            HttpResponse::Ok().json(ApiResponse::ok("Book retrieved successfully", Some(book)))
        }
        Err(err) => error_response("Get book", err),
    })
}

pub async fn update_book(
    library_store: Data<Arc<dyn LibraryStore>>,
    book_id: web::Path<String>,
    patch: web::Json<BookDraft>,
) -> Result<HttpResponse, Error> {
    Ok(
        match library_store
            .update_book(&book_id, patch.into_inner())
            .await
        {
            Ok(book) => {
                HttpResponse::Ok().json(ApiResponse::ok("Book updated successfully", Some(book)))
            }
            Err(err) => error_response("Update book", err),
        },
    )
}

pub async fn delete_book(
    library_store: Data<Arc<dyn LibraryStore>>,
    book_id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(match library_store.delete_book(&book_id).await {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::<()>::ok("Book deleted successfully", None)),
        Err(err) => error_response("Delete book", err),
    })
}

pub async fn borrow_book(
    library_store: Data<Arc<dyn LibraryStore>>,
    request: web::Json<BorrowRequest>,
) -> Result<HttpResponse, Error> {
    Ok(match library_store.borrow_book(request.into_inner()).await {
        Ok(()) => {
            HttpResponse::Created().json(ApiResponse::<()>::ok("Book borrowed successfully", None))
        }
        Err(err) => error_response("Borrow book", err),
    })
}

pub async fn get_borrow_summary(
    library_store: Data<Arc<dyn LibraryStore>>,
) -> Result<HttpResponse, Error> {
    Ok(match library_store.borrow_summary().await {
        Ok(summary) => HttpResponse::Ok().json(ApiResponse::ok(
            "Borrowed books summary retrieved successfully",
            Some(summary),
        )),
        Err(err) => error_response("Borrow summary", err),
    })
}

/// Envelope with `success: false` and the store error as message
fn error_response(operation: &str, err: LibraryStoreError) -> HttpResponse {
    let body = ApiResponse::<()>::failure(err.to_string(), Some(json!({ "name": error_name(&err) })));
    match err {
        LibraryStoreError::NotFound(_) => HttpResponse::NotFound().json(body),
        LibraryStoreError::Invalid(_) | LibraryStoreError::NotEnoughCopies { .. } => {
            HttpResponse::BadRequest().json(body)
        }
        LibraryStoreError::DuplicateIsbn(_) => HttpResponse::Conflict().json(body),
        LibraryStoreError::DeserializationError(_) => {
            tracing::error!("{} failed {}", operation, err);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

fn error_name(err: &LibraryStoreError) -> &'static str {
    match err {
        LibraryStoreError::NotFound(_) => "NotFoundError",
        LibraryStoreError::Invalid(_) | LibraryStoreError::NotEnoughCopies { .. } => {
            "ValidationError"
        }
        LibraryStoreError::DuplicateIsbn(_) => "DuplicateKeyError",
        LibraryStoreError::DeserializationError(_) => "InternalError",
    }
}
