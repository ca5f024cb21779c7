pub mod actions;
pub mod api;
pub mod error;
pub mod forms;
pub mod repository;
pub mod settings;
pub mod summary;
pub mod validation;

#[cfg(any(feature = "client", test))]
pub mod client;

pub use error::ApiError;
pub use repository::{LibraryApi, LibraryRepository, ResourceKind};
