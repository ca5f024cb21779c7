//! Client side rules checked before a book or borrow payload is sent.
//!
//! Every rule reports into a [`FieldErrors`] map keyed by form field. An empty
//! map means the payload can be submitted.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use crate::api::{Book, BookDraft};

pub const TITLE_REQUIRED: &str = "Title is required";
pub const AUTHOR_REQUIRED: &str = "Author is required";
pub const ISBN_REQUIRED: &str = "ISBN is required";
pub const COPIES_NON_NEGATIVE: &str = "Copies must be a non-negative number";
pub const QUANTITY_AT_LEAST_ONE: &str = "Quantity must be at least 1";
pub const DUE_DATE_REQUIRED: &str = "Due date is required";
pub const DUE_DATE_IN_FUTURE: &str = "Due date must be in the future";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum BookField {
    Title,
    Author,
    Isbn,
    Copies,
}

impl BookField {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookField::Title => "title",
            BookField::Author => "author",
            BookField::Isbn => "isbn",
            BookField::Copies => "copies",
        }
    }
}

impl fmt::Display for BookField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum BorrowField {
    Quantity,
    DueDate,
}

impl BorrowField {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowField::Quantity => "quantity",
            BorrowField::DueDate => "dueDate",
        }
    }
}

impl fmt::Display for BorrowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per field error state of a form.
///
/// A cleared field keeps its key with `None`, so editing one field never
/// touches the entries of the others. Full validation swaps the whole map.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FieldErrors<F: Ord> {
    errors: BTreeMap<F, Option<String>>,
}

impl<F: Ord> Default for FieldErrors<F> {
    fn default() -> Self {
        Self {
            errors: BTreeMap::new(),
        }
    }
}

impl<F: Ord + Copy> FieldErrors<F> {
    pub fn set(&mut self, field: F, message: impl Into<String>) {
        self.errors.insert(field, Some(message.into()));
    }

    /// Clears the error of a single field, returns true if there was one
    pub fn clear(&mut self, field: F) -> bool {
        match self.errors.get_mut(&field) {
            Some(message) if message.is_some() => {
                *message = None;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, field: F) -> Option<&str> {
        self.errors.get(&field).and_then(|message| message.as_deref())
    }

    pub fn has_error(&self, field: F) -> bool {
        self.get(field).is_some()
    }

    /// True when no field carries an error
    pub fn is_empty(&self) -> bool {
        self.errors.values().all(Option::is_none)
    }

    pub fn len(&self) -> usize {
        self.errors.values().filter(|message| message.is_some()).count()
    }

    /// Fields with an active error, in field order
    pub fn iter(&self) -> impl Iterator<Item = (F, &str)> + '_ {
        self.errors
            .iter()
            .filter_map(|(&field, message)| message.as_deref().map(|message| (field, message)))
    }

    pub fn replace_with(&mut self, other: FieldErrors<F>) {
        *self = other;
    }
}

/// Checks a create or edit payload. Missing text fields count as empty and a
/// missing copies value counts as invalid.
pub fn validate_book(draft: &BookDraft) -> FieldErrors<BookField> {
    let mut errors = FieldErrors::default();

    if is_blank(draft.title.as_deref()) {
        errors.set(BookField::Title, TITLE_REQUIRED);
    }
    if is_blank(draft.author.as_deref()) {
        errors.set(BookField::Author, AUTHOR_REQUIRED);
    }
    if is_blank(draft.isbn.as_deref()) {
        errors.set(BookField::Isbn, ISBN_REQUIRED);
    }
    if draft.copies.map_or(true, |copies| copies < 0) {
        errors.set(BookField::Copies, COPIES_NON_NEGATIVE);
    }

    errors
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// Raw borrow form input, before it becomes a [`crate::api::BorrowRequest`]
pub struct BorrowInput {
    pub quantity: i64,
    pub due_date: Option<NaiveDate>,
}

/// Checks a borrow against the referenced book (when it is loaded) and the
/// current calendar day. Due dates are compared by day only.
pub fn validate_borrow(
    input: &BorrowInput,
    book: Option<&Book>,
    today: NaiveDate,
) -> FieldErrors<BorrowField> {
    let mut errors = FieldErrors::default();

    if input.quantity < 1 {
        errors.set(BorrowField::Quantity, QUANTITY_AT_LEAST_ONE);
    }
    if let Some(book) = book {
        if input.quantity > i64::from(book.copies) {
            errors.set(BorrowField::Quantity, copies_available(book.copies));
        }
    }

    match input.due_date {
        None => errors.set(BorrowField::DueDate, DUE_DATE_REQUIRED),
        Some(due_date) if due_date <= today => {
            errors.set(BorrowField::DueDate, DUE_DATE_IN_FUTURE)
        }
        Some(_) => {}
    }

    errors
}

pub fn copies_available(copies: u32) -> String {
    format!("Only {} copies available", copies)
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |value| value.trim().is_empty())
}
