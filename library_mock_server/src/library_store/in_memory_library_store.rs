use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde_json::json;

use library_catalog::api::{
    Book, BookDraft, BookId, BorrowRequest, BorrowSummary, BorrowedBook, ListBooksParams, SortBy,
    SortOrder,
};

use crate::library_store::{LibraryStore, LibraryStoreError, DEFAULT_LIST_LIMIT};

struct LedgerEntry {
    book_id: BookId,
    book: BorrowedBook,
    total_quantity: u64,
}

#[derive(Default)]
struct LibraryState {
    books: HashMap<BookId, Book>,
    ledger: Vec<LedgerEntry>,
}

impl LibraryState {
    fn isbn_taken(&self, isbn: &str, except: Option<&str>) -> bool {
        self.books
            .values()
            .any(|book| book.isbn == isbn && Some(book.id.as_str()) != except)
    }
}

pub struct InMemoryLibraryStore {
    book_sequence_generator: AtomicU64,
    state: parking_lot::RwLock<LibraryState>,
}

impl Default for InMemoryLibraryStore {
    fn default() -> Self {
        Self {
            book_sequence_generator: AtomicU64::new(1),
            state: Default::default(),
        }
    }
}

impl InMemoryLibraryStore {
    fn next_id(&self) -> BookId {
        let sequence = self.book_sequence_generator.fetch_add(1, Ordering::Relaxed);
        format!("{:024x}", sequence)
    }
}

#[async_trait::async_trait]
impl LibraryStore for InMemoryLibraryStore {
    async fn add_book(&self, draft: BookDraft) -> Result<Book, LibraryStoreError> {
        check_draft(&draft, true)?;
        let copies = copies_of(&draft)?;

        let mut state = self.state.write();
        let isbn = draft.isbn.unwrap_or_default();
        if state.isbn_taken(&isbn, None) {
            return Err(LibraryStoreError::DuplicateIsbn(isbn));
        }

        let now = Utc::now();
        let book = Book {
            id: self.next_id(),
            title: draft.title.unwrap_or_default(),
            author: draft.author.unwrap_or_default(),
            genre: draft.genre.unwrap_or_default(),
            isbn,
            description: draft.description,
            copies,
            available: copies > 0,
            created_at: now,
            updated_at: now,
        };
        state.books.insert(book.id.clone(), book.clone());
        Ok(book)
    }

    async fn update_book(
        &self,
        book_id: &str,
        patch: BookDraft,
    ) -> Result<Book, LibraryStoreError> {
        check_draft(&patch, false)?;
        if let Some(copies) = patch.copies {
            copies_in_range(copies)?;
        }

        let mut state = self.state.write();
        if !state.books.contains_key(book_id) {
            return Err(LibraryStoreError::NotFound(book_id.to_string()));
        }
        if let Some(isbn) = &patch.isbn {
            if state.isbn_taken(isbn, Some(book_id)) {
                return Err(LibraryStoreError::DuplicateIsbn(isbn.clone()));
            }
        }
        let book = state
            .books
            .get_mut(book_id)
            .ok_or_else(|| LibraryStoreError::NotFound(book_id.to_string()))?;

        let mut result_book = json!(book);
        json_patch::merge(&mut result_book, &json!(patch));
        let mut result_book: Book = serde_json::from_value(result_book)?;
        result_book.available = result_book.copies > 0;
        result_book.updated_at = Utc::now();
        *book = result_book.clone();
        Ok(result_book)
    }

    async fn get_book(&self, book_id: &str) -> Result<Book, LibraryStoreError> {
        self.state
            .read()
            .books
            .get(book_id)
            .cloned()
            .ok_or_else(|| LibraryStoreError::NotFound(book_id.to_string()))
    }

    async fn delete_book(&self, book_id: &str) -> Result<(), LibraryStoreError> {
        self.state
            .write()
            .books
            .remove(book_id)
            .map(|_| ())
            .ok_or_else(|| LibraryStoreError::NotFound(book_id.to_string()))
    }

    async fn list_books(&self, params: &ListBooksParams) -> Result<Vec<Book>, LibraryStoreError> {
        let mut books: Vec<Book> = self
            .state
            .read()
            .books
            .values()
            .filter(|book| params.filter.map_or(true, |genre| book.genre == genre))
            .cloned()
            .collect();

        let sort_by = params.sort_by.unwrap_or_default();
        let sort = params.sort.unwrap_or(SortOrder::Asc);
        books.sort_by(|a, b| {
            let ordering = compare_by(sort_by, a, b).then_with(|| a.id.cmp(&b.id));
            match sort {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let limit = params
            .limit
            .map_or(DEFAULT_LIST_LIMIT, |limit| limit as usize);
        books.truncate(limit);
        Ok(books)
    }

    async fn borrow_book(&self, request: BorrowRequest) -> Result<(), LibraryStoreError> {
        if request.quantity < 1 {
            return Err(LibraryStoreError::Invalid(
                "Quantity must be a positive number".to_string(),
            ));
        }

        let mut state = self.state.write();
        let book = state
            .books
            .get_mut(&request.book)
            .ok_or_else(|| LibraryStoreError::NotFound(request.book.clone()))?;
        if request.quantity > book.copies {
            return Err(LibraryStoreError::NotEnoughCopies {
                requested: request.quantity,
                available: book.copies,
            });
        }

        book.copies -= request.quantity;
        book.available = book.copies > 0;
        book.updated_at = Utc::now();
        let borrowed = BorrowedBook {
            title: book.title.clone(),
            isbn: book.isbn.clone(),
        };

        match state
            .ledger
            .iter_mut()
            .find(|entry| entry.book_id == request.book)
        {
            Some(entry) => {
                entry.book = borrowed;
                entry.total_quantity += u64::from(request.quantity);
            }
            None => state.ledger.push(LedgerEntry {
                book_id: request.book,
                book: borrowed,
                total_quantity: u64::from(request.quantity),
            }),
        }
        Ok(())
    }

    async fn borrow_summary(&self) -> Result<Vec<BorrowSummary>, LibraryStoreError> {
        Ok(self
            .state
            .read()
            .ledger
            .iter()
            .map(|entry| BorrowSummary {
                book: entry.book.clone(),
                total_quantity: entry.total_quantity,
            })
            .collect())
    }
}

/// Text fields must not be blank when present, and all of them must be present on create
fn check_draft(draft: &BookDraft, require_all: bool) -> Result<(), LibraryStoreError> {
    let required = [
        ("title", draft.title.as_deref()),
        ("author", draft.author.as_deref()),
        ("isbn", draft.isbn.as_deref()),
    ];
    for (name, value) in required {
        match value {
            Some(value) if value.trim().is_empty() => {
                return Err(LibraryStoreError::Invalid(format!("{} is required", name)))
            }
            None if require_all => {
                return Err(LibraryStoreError::Invalid(format!("{} is required", name)))
            }
            _ => {}
        }
    }
    if require_all && draft.genre.is_none() {
        return Err(LibraryStoreError::Invalid("genre is required".to_string()));
    }
    if draft.copies.is_some_and(|copies| copies < 0) {
        return Err(LibraryStoreError::Invalid(
            "Copies must be a positive number".to_string(),
        ));
    }
    Ok(())
}

fn copies_of(draft: &BookDraft) -> Result<u32, LibraryStoreError> {
    copies_in_range(draft.copies.unwrap_or_default())
}

fn copies_in_range(copies: i64) -> Result<u32, LibraryStoreError> {
    u32::try_from(copies).map_err(|_| LibraryStoreError::Invalid("Copies out of range".to_string()))
}

fn compare_by(sort_by: SortBy, a: &Book, b: &Book) -> CmpOrdering {
    match sort_by {
        SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        SortBy::Title => a.title.cmp(&b.title),
        SortBy::Author => a.author.cmp(&b.author),
        SortBy::Copies => a.copies.cmp(&b.copies),
    }
}
