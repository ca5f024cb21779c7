//! User facing flows of the catalog pages.
//!
//! Each flow validates locally, calls the repository at most once and turns
//! the result into a notification or a view state. Failures stay inside the
//! flow that produced them.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;

use crate::api::{Book, ListBooksParams};
use crate::error::ApiError;
use crate::forms::{BookForm, BorrowForm};
use crate::repository::{LibraryApi, LibraryRepository};
use crate::summary::{summarize, BorrowSummaryReport};

pub const BOOK_CREATED: &str = "Book created successfully!";
pub const BOOK_UPDATED: &str = "Book updated successfully!";
pub const BOOK_DELETED: &str = "Book deleted successfully";
pub const BOOK_BORROWED: &str = "Book borrowed successfully!";

pub const CREATE_FAILED: &str = "Failed to create book";
pub const UPDATE_FAILED: &str = "Failed to update book!";
pub const DELETE_FAILED: &str = "Failed to delete book";
pub const BORROW_FAILED: &str = "Failed to borrow book";
pub const LOAD_BOOK_FAILED: &str = "Error loading book details.";
pub const LOAD_BOOKS_FAILED: &str = "Error loading books. Please try again.";
pub const LOAD_SUMMARY_FAILED: &str = "Error loading borrow summary. Please try again.";

pub const MISSING_ID_UPDATE: &str = "Book ID is missing. Cannot update.";
pub const MISSING_ID_BORROW: &str = "Book ID is missing. Cannot borrow book.";
pub const INCOMPLETE_BOOK: &str = "Please ensure all required fields are filled and valid.";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, Eq, PartialEq)]
/// Single message shown to the user after an action
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    fn from_api_error(err: &ApiError, fallback: &str) -> Self {
        Self::error(err.user_message(fallback))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<T> {
    /// The service accepted the request
    Done { value: T, notification: Notification },
    /// Local validation failed, errors are on the form and nothing was sent
    Invalid,
    /// Another submission of the same form is still running
    InFlight,
    /// The request could not be sent or the service refused it
    Failed(Notification),
}

impl<T> SubmitOutcome<T> {
    pub fn notification(&self) -> Option<&Notification> {
        match self {
            SubmitOutcome::Done { notification, .. } | SubmitOutcome::Failed(notification) => {
                Some(notification)
            }
            SubmitOutcome::Invalid | SubmitOutcome::InFlight => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, SubmitOutcome::Done { .. })
    }
}

/// Keeps a form to one outstanding submission at a time
#[derive(Debug, Default)]
pub struct SubmitGate {
    in_flight: AtomicBool,
}

/// Held while a submission runs, reopens the gate when dropped
pub struct SubmitPermit<'a> {
    gate: &'a SubmitGate,
}

impl SubmitGate {
    pub fn try_enter(&self) -> Option<SubmitPermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitPermit { gate: self })
    }

    /// Whether the submit control should be disabled
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for SubmitPermit<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq)]
/// What a page that shows one book renders
pub enum BookView {
    Found(Book),
    /// Dedicated not-found state with a way back to the listing
    NotFound,
    Failed(String),
}

/// Whether a loaded book can be borrowed. Trusts the `available` flag as sent by the service
pub fn borrow_blocker(book: &Book) -> Option<String> {
    if !book.available || book.copies == 0 {
        Some(format!(
            "{} is currently unavailable for borrowing.",
            book.title
        ))
    } else {
        None
    }
}

pub async fn load_book<A: LibraryApi>(repo: &LibraryRepository<A>, book_id: &str) -> BookView {
    if book_id.trim().is_empty() {
        return BookView::NotFound;
    }
    match repo.book(book_id).await {
        Ok(book) => BookView::Found(book),
        Err(ApiError::NotFound { .. }) => BookView::NotFound,
        Err(err) => {
            tracing::error!("Loading book {} failed {}", book_id, err);
            BookView::Failed(err.user_message(LOAD_BOOK_FAILED))
        }
    }
}

/// Books for the listing page, or the message to show instead
pub async fn load_books<A: LibraryApi>(
    repo: &LibraryRepository<A>,
    params: &ListBooksParams,
) -> Result<Vec<Book>, String> {
    repo.books(params).await.map_err(|err| {
        tracing::error!("Listing books failed {}", err);
        LOAD_BOOKS_FAILED.to_string()
    })
}

/// Aggregated borrow summary, or the message to show instead
pub async fn load_borrow_summary<A: LibraryApi>(
    repo: &LibraryRepository<A>,
) -> Result<BorrowSummaryReport, String> {
    repo.borrow_summary()
        .await
        .map(|summaries| summarize(&summaries))
        .map_err(|err| {
            tracing::error!("Loading borrow summary failed {}", err);
            LOAD_SUMMARY_FAILED.to_string()
        })
}

pub async fn create_book<A: LibraryApi>(
    repo: &LibraryRepository<A>,
    gate: &SubmitGate,
    form: &mut BookForm,
) -> SubmitOutcome<Book> {
    if !form.validate() {
        return SubmitOutcome::Invalid;
    }
    let Some(_permit) = gate.try_enter() else {
        return SubmitOutcome::InFlight;
    };

    match repo.create_book(&form.draft()).await {
        Ok(book) => SubmitOutcome::Done {
            value: book,
            notification: Notification::success(BOOK_CREATED),
        },
        Err(err) => SubmitOutcome::Failed(Notification::from_api_error(&err, CREATE_FAILED)),
    }
}

pub async fn update_book<A: LibraryApi>(
    repo: &LibraryRepository<A>,
    gate: &SubmitGate,
    book_id: Option<&str>,
    form: &mut BookForm,
) -> SubmitOutcome<Book> {
    if !form.validate() {
        return SubmitOutcome::Invalid;
    }
    let Some(book_id) = book_id.filter(|id| !id.is_empty()) else {
        return SubmitOutcome::Failed(Notification::error(MISSING_ID_UPDATE));
    };
    if form.missing_required() {
        return SubmitOutcome::Failed(Notification::error(INCOMPLETE_BOOK));
    }
    let Some(_permit) = gate.try_enter() else {
        return SubmitOutcome::InFlight;
    };

    match repo.update_book(book_id, &form.draft()).await {
        Ok(book) => SubmitOutcome::Done {
            value: book,
            notification: Notification::success(BOOK_UPDATED),
        },
        Err(err) => SubmitOutcome::Failed(Notification::from_api_error(&err, UPDATE_FAILED)),
    }
}

pub async fn delete_book<A: LibraryApi>(
    repo: &LibraryRepository<A>,
    gate: &SubmitGate,
    book_id: &str,
) -> SubmitOutcome<()> {
    let Some(_permit) = gate.try_enter() else {
        return SubmitOutcome::InFlight;
    };

    match repo.delete_book(book_id).await {
        Ok(()) => SubmitOutcome::Done {
            value: (),
            notification: Notification::success(BOOK_DELETED),
        },
        Err(err) => SubmitOutcome::Failed(Notification::from_api_error(&err, DELETE_FAILED)),
    }
}

/// Borrows from `book` using the form values, `book` is the record the page loaded
pub async fn borrow_book<A: LibraryApi>(
    repo: &LibraryRepository<A>,
    gate: &SubmitGate,
    book: Option<&Book>,
    form: &mut BorrowForm,
    today: NaiveDate,
) -> SubmitOutcome<()> {
    if !form.validate(book, today) {
        return SubmitOutcome::Invalid;
    }
    let Some(request) = book.and_then(|book| form.request(&book.id)) else {
        return SubmitOutcome::Failed(Notification::error(MISSING_ID_BORROW));
    };
    let Some(_permit) = gate.try_enter() else {
        return SubmitOutcome::InFlight;
    };

    match repo.borrow_book(&request).await {
        Ok(()) => SubmitOutcome::Done {
            value: (),
            notification: Notification::success(BOOK_BORROWED),
        },
        Err(err) => SubmitOutcome::Failed(Notification::from_api_error(&err, BORROW_FAILED)),
    }
}
