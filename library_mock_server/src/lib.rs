use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use tracing_actix_web::TracingLogger;

use crate::app_config::config_app;
use crate::library_store::LibraryStore;

pub mod app_config;
pub mod library_store;

mod handlers;

/// Starts serving the library API on `listener`, the returned server must be awaited or spawned
pub fn run(listener: TcpListener, store: Arc<dyn LibraryStore>) -> std::io::Result<Server> {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(store.clone()))
            .wrap(TracingLogger::default())
            .configure(config_app)
    })
    .listen(listener)?
    .run();
    Ok(server)
}
