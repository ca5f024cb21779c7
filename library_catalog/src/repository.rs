use std::collections::HashMap;

use crate::api::{Book, BookDraft, BookId, BorrowRequest, BorrowSummary, ListBooksParams};
use crate::error::ApiError;

/// Operations offered by the remote library service
#[async_trait::async_trait]
pub trait LibraryApi: Send + Sync {
    /// Lists books matching the filter and sort parameters
    async fn list_books(&self, params: &ListBooksParams) -> Result<Vec<Book>, ApiError>;
    /// Retrieves a single book, `ApiError::NotFound` if it does not exist
    async fn get_book(&self, book_id: &str) -> Result<Book, ApiError>;
    /// Creates a book, returns the record with its assigned id
    async fn create_book(&self, draft: &BookDraft) -> Result<Book, ApiError>;
    /// Applies the fields present in `draft` to an existing book
    async fn update_book(&self, book_id: &str, draft: &BookDraft) -> Result<Book, ApiError>;
    async fn delete_book(&self, book_id: &str) -> Result<(), ApiError>;
    async fn borrow_book(&self, request: &BorrowRequest) -> Result<(), ApiError>;
    /// Borrowed quantity per book over all borrows
    async fn borrow_summary(&self) -> Result<Vec<BorrowSummary>, ApiError>;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
/// Groups of cached reads that a mutation can make stale
pub enum ResourceKind {
    Book,
    Borrow,
}

impl ResourceKind {
    /// Kinds a successful borrow makes stale, copies change along with the ledger
    pub const BORROW_MUTATION: [ResourceKind; 2] = [ResourceKind::Book, ResourceKind::Borrow];
}

#[derive(Default)]
struct QueryCache {
    book_lists: HashMap<ListBooksParams, Vec<Book>>,
    books: HashMap<BookId, Book>,
    borrow_summary: Option<Vec<BorrowSummary>>,
    /// Bumped on every invalidation, a read only stores its result if the
    /// generation it started under is still current
    book_generation: u64,
    borrow_generation: u64,
}

impl QueryCache {
    fn generation(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Book => self.book_generation,
            ResourceKind::Borrow => self.borrow_generation,
        }
    }
}

/// Read-through access to the library service.
///
/// Reads are served from the cache until the kind they belong to is
/// invalidated. Every successful mutation invalidates the kinds it affects,
/// so the next read after it goes back to the service.
pub struct LibraryRepository<A: LibraryApi> {
    api: A,
    cache: parking_lot::RwLock<QueryCache>,
}

impl<A: LibraryApi> LibraryRepository<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            cache: Default::default(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn books(&self, params: &ListBooksParams) -> Result<Vec<Book>, ApiError> {
        let generation = match self.cached(ResourceKind::Book, |cache| {
            cache.book_lists.get(params).cloned()
        }) {
            Ok(books) => return Ok(books),
            Err(generation) => generation,
        };
        let books = self.api.list_books(params).await?;
        self.store(ResourceKind::Book, generation, |cache| {
            cache.book_lists.insert(params.clone(), books.clone());
        });
        Ok(books)
    }

    pub async fn book(&self, book_id: &str) -> Result<Book, ApiError> {
        let generation = match self.cached(ResourceKind::Book, |cache| {
            cache.books.get(book_id).cloned()
        }) {
            Ok(book) => return Ok(book),
            Err(generation) => generation,
        };
        let book = self.api.get_book(book_id).await?;
        self.store(ResourceKind::Book, generation, |cache| {
            cache.books.insert(book_id.to_string(), book.clone());
        });
        Ok(book)
    }

    pub async fn borrow_summary(&self) -> Result<Vec<BorrowSummary>, ApiError> {
        let generation = match self.cached(ResourceKind::Borrow, |cache| {
            cache.borrow_summary.clone()
        }) {
            Ok(summary) => return Ok(summary),
            Err(generation) => generation,
        };
        let summary = self.api.borrow_summary().await?;
        self.store(ResourceKind::Borrow, generation, |cache| {
            cache.borrow_summary = Some(summary.clone());
        });
        Ok(summary)
    }

    pub async fn create_book(&self, draft: &BookDraft) -> Result<Book, ApiError> {
        let book = self.api.create_book(draft).await?;
        self.invalidate(ResourceKind::Book);
        Ok(book)
    }

    pub async fn update_book(&self, book_id: &str, draft: &BookDraft) -> Result<Book, ApiError> {
        let book = self.api.update_book(book_id, draft).await?;
        self.invalidate(ResourceKind::Book);
        Ok(book)
    }

    pub async fn delete_book(&self, book_id: &str) -> Result<(), ApiError> {
        self.api.delete_book(book_id).await?;
        self.invalidate(ResourceKind::Book);
        Ok(())
    }

    pub async fn borrow_book(&self, request: &BorrowRequest) -> Result<(), ApiError> {
        self.api.borrow_book(request).await?;
        for kind in ResourceKind::BORROW_MUTATION {
            self.invalidate(kind);
        }
        Ok(())
    }

    /// Cached value, or the current generation of `kind` to fetch under
    fn cached<T>(
        &self,
        kind: ResourceKind,
        lookup: impl FnOnce(&QueryCache) -> Option<T>,
    ) -> Result<T, u64> {
        let cache = self.cache.read();
        lookup(&*cache).ok_or_else(|| cache.generation(kind))
    }

    /// Stores a fetched value unless `kind` was invalidated while it was in flight
    fn store(&self, kind: ResourceKind, generation: u64, insert: impl FnOnce(&mut QueryCache)) {
        let mut cache = self.cache.write();
        if cache.generation(kind) == generation {
            insert(&mut *cache);
        } else {
            tracing::debug!("Dropping {:?} read that overlapped an invalidation", kind);
        }
    }

    /// Drops every cached read of the given kind
    pub fn invalidate(&self, kind: ResourceKind) {
        tracing::debug!("Invalidating cached {:?} reads", kind);
        let mut cache = self.cache.write();
        match kind {
            ResourceKind::Book => {
                cache.book_generation = cache.book_generation.wrapping_add(1);
                cache.book_lists.clear();
                cache.books.clear();
            }
            ResourceKind::Borrow => {
                cache.borrow_generation = cache.borrow_generation.wrapping_add(1);
                cache.borrow_summary = None;
            }
        }
    }
}


#[cfg(test)]
mod library_repository_tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use tokio::sync::Notify;

    use crate::api::{BookDraft, BorrowRequest, ListBooksParams};

    use super::test_api::CountingApi;
    use super::{LibraryRepository, ResourceKind};

    #[tokio::test]
    async fn reads_are_cached_until_invalidated() {
        let (api, book) = CountingApi::with_book(2);
        let repo = LibraryRepository::new(api);
        let params = ListBooksParams::default();

        repo.books(&params).await.expect("Failed to list books");
        repo.books(&params).await.expect("Failed to list books");
        repo.book(&book.id).await.expect("Failed to get book");
        repo.book(&book.id).await.expect("Failed to get book");
        assert_eq!(CountingApi::calls(&repo.api().list_calls), 1);
        assert_eq!(CountingApi::calls(&repo.api().get_calls), 1);

        // different parameters are a different query
        repo.books(&ListBooksParams::unfiltered())
            .await
            .expect("Failed to list books");
        assert_eq!(CountingApi::calls(&repo.api().list_calls), 2);

        repo.invalidate(ResourceKind::Book);
        repo.books(&params).await.expect("Failed to list books");
        repo.book(&book.id).await.expect("Failed to get book");
        assert_eq!(CountingApi::calls(&repo.api().list_calls), 3);
        assert_eq!(CountingApi::calls(&repo.api().get_calls), 2);
    }

    #[tokio::test]
    async fn book_mutations_refetch_books_but_keep_summary() {
        let (api, book) = CountingApi::with_book(2);
        let repo = LibraryRepository::new(api);
        let params = ListBooksParams::default();

        assert_eq!(repo.books(&params).await.unwrap().len(), 1);
        repo.borrow_summary().await.unwrap();

        let created = repo
            .create_book(&BookDraft {
                title: Some("Emma".to_string()),
                copies: Some(1),
                ..BookDraft::default()
            })
            .await
            .expect("Failed to create book");
        assert_eq!(repo.books(&params).await.unwrap().len(), 2);

        repo.update_book(
            &book.id,
            &BookDraft {
                title: Some("Dune Messiah".to_string()),
                ..BookDraft::default()
            },
        )
        .await
        .expect("Failed to update book");
        assert_eq!(repo.book(&book.id).await.unwrap().title, "Dune Messiah");

        repo.delete_book(&created.id)
            .await
            .expect("Failed to delete book");
        assert_eq!(repo.books(&params).await.unwrap().len(), 1);

        repo.borrow_summary().await.unwrap();
        assert_eq!(CountingApi::calls(&repo.api().summary_calls), 1);
    }

    #[tokio::test]
    async fn borrow_refetches_books_and_summary() {
        let (api, book) = CountingApi::with_book(3);
        let repo = LibraryRepository::new(api);

        assert_eq!(repo.book(&book.id).await.unwrap().copies, 3);
        assert!(repo.borrow_summary().await.unwrap().is_empty());

        repo.borrow_book(&BorrowRequest {
            book: book.id.clone(),
            quantity: 2,
            due_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        })
        .await
        .expect("Failed to borrow");

        assert_eq!(repo.book(&book.id).await.unwrap().copies, 1);
        let summary = repo.borrow_summary().await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].total_quantity, 2);
        assert_eq!(CountingApi::calls(&repo.api().get_calls), 2);
        assert_eq!(CountingApi::calls(&repo.api().summary_calls), 2);
    }

    #[tokio::test]
    async fn failed_mutation_keeps_cache() {
        let (api, book) = CountingApi::with_book(1);
        let repo = LibraryRepository::new(api);

        repo.book(&book.id).await.unwrap();
        let result = repo.delete_book("missing").await;
        assert!(matches!(result, Err(err) if err.is_not_found()));

        repo.book(&book.id).await.unwrap();
        assert_eq!(CountingApi::calls(&repo.api().get_calls), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let (api, book) = CountingApi::with_book(1);
        *api.reject_with.write() = Some(crate::error::ApiError::Transport(
            "connection reset".to_string(),
        ));
        let repo = LibraryRepository::new(api);

        assert!(repo.book(&book.id).await.is_err());
        assert!(repo.book(&book.id).await.is_ok());
        assert_eq!(CountingApi::calls(&repo.api().get_calls), 2);
    }

    #[tokio::test]
    async fn read_overlapping_an_update_is_not_cached() {
        let (api, book) = CountingApi::with_book(5);
        let release = Arc::new(Notify::new());
        *api.hold_next_read.write() = Some(release.clone());
        let repo = LibraryRepository::new(api);

        let (slow_read, update) = tokio::join!(repo.book(&book.id), async {
            let updated = repo
                .update_book(
                    &book.id,
                    &BookDraft {
                        copies: Some(0),
                        ..BookDraft::default()
                    },
                )
                .await;
            release.notify_one();
            updated
        });
        // the read saw the book before the update landed
        assert_eq!(slow_read.expect("Failed to get book").copies, 5);
        assert_eq!(update.expect("Failed to update book").copies, 0);

        assert_eq!(repo.book(&book.id).await.unwrap().copies, 0);
        assert_eq!(CountingApi::calls(&repo.api().get_calls), 2);
        repo.book(&book.id).await.unwrap();
        assert_eq!(CountingApi::calls(&repo.api().get_calls), 2);
    }
}
