use actix_web::error::InternalError;
use actix_web::{web, HttpResponse};

use library_catalog::api::ApiResponse;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/api")
                .service(
                    web::resource("/books")
                        .route(web::get().to(handlers::get_all_books))
                        .route(web::post().to(handlers::add_book)),
                )
                .service(
                    web::resource("/books/{book_id}")
                        .route(web::get().to(handlers::get_book))
                        .route(web::put().to(handlers::update_book))
                        .route(web::delete().to(handlers::delete_book)),
                )
                .service(
                    web::resource("/borrow")
                        .route(web::get().to(handlers::get_borrow_summary))
                        .route(web::post().to(handlers::borrow_book)),
                ),
        );
}

/// Malformed bodies are answered with the usual failure envelope
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = format!("Validation failed: {}", err);
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(ApiResponse::<()>::failure(message, None)),
        )
        .into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid query: {}", err);
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(ApiResponse::<()>::failure(message, None)),
        )
        .into()
    })
}
