pub use in_memory_library_store::InMemoryLibraryStore;

use library_catalog::api::{
    Book, BookDraft, BookId, BorrowRequest, BorrowSummary, ListBooksParams,
};

mod in_memory_library_store;

/// Page size used when a listing does not ask for one
pub const DEFAULT_LIST_LIMIT: usize = 10;

#[derive(thiserror::Error, Debug)]
pub enum LibraryStoreError {
    #[error("Book not found")]
    NotFound(BookId),

    #[error("{0}")]
    Invalid(String),

    #[error("Book with ISBN {0} already exists")]
    DuplicateIsbn(String),

    #[error("Not enough copies available")]
    NotEnoughCopies { requested: u32, available: u32 },

    #[error("Failed to deserialize book: {0}")]
    DeserializationError(#[from] serde_json::Error),
}

#[async_trait::async_trait]
pub trait LibraryStore: Send + Sync {
    /// Adds book to the store, returns the stored record with its assigned id
    async fn add_book(&self, draft: BookDraft) -> Result<Book, LibraryStoreError>;
    /// Merges the fields present in `patch` into the book
    async fn update_book(&self, book_id: &str, patch: BookDraft)
        -> Result<Book, LibraryStoreError>;
    async fn get_book(&self, book_id: &str) -> Result<Book, LibraryStoreError>;
    async fn delete_book(&self, book_id: &str) -> Result<(), LibraryStoreError>;
    /// Lists books filtered by genre and sorted as requested
    async fn list_books(&self, params: &ListBooksParams) -> Result<Vec<Book>, LibraryStoreError>;
    /// Takes copies out of the book and records them in the borrow ledger
    async fn borrow_book(&self, request: BorrowRequest) -> Result<(), LibraryStoreError>;
    /// Borrowed quantity per book, in the order books were first borrowed
    async fn borrow_summary(&self) -> Result<Vec<BorrowSummary>, LibraryStoreError>;
}
