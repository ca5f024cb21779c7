//! Editable state of the book and borrow forms.
//!
//! Setters clear the error of the field they touch and nothing else.
//! `validate` re-runs every rule and replaces the error map as a whole.

use chrono::{Days, NaiveDate};

use crate::api::{Book, BookDraft, BookId, BorrowRequest, Genre};
use crate::validation::{
    validate_book, validate_borrow, BookField, BorrowField, BorrowInput, FieldErrors,
};

/// Days between today and the due date a new borrow form starts with
pub const DEFAULT_LOAN_DAYS: u64 = 14;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BookFormValues {
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    pub description: String,
    pub copies: i64,
}

impl Default for BookFormValues {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            genre: Genre::Fiction,
            isbn: String::new(),
            description: String::new(),
            copies: 1,
        }
    }
}

impl From<&Book> for BookFormValues {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre,
            isbn: book.isbn.clone(),
            description: book.description.clone().unwrap_or_default(),
            copies: i64::from(book.copies),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookForm {
    values: BookFormValues,
    errors: FieldErrors<BookField>,
}

impl BookForm {
    /// Empty form for a new book
    pub fn new() -> Self {
        Self::default()
    }

    /// Form prefilled with an existing book, for editing
    pub fn for_book(book: &Book) -> Self {
        Self {
            values: book.into(),
            errors: FieldErrors::default(),
        }
    }

    pub fn values(&self) -> &BookFormValues {
        &self.values
    }

    pub fn errors(&self) -> &FieldErrors<BookField> {
        &self.errors
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.values.title = title.into();
        self.errors.clear(BookField::Title);
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.values.author = author.into();
        self.errors.clear(BookField::Author);
    }

    pub fn set_isbn(&mut self, isbn: impl Into<String>) {
        self.values.isbn = isbn.into();
        self.errors.clear(BookField::Isbn);
    }

    pub fn set_genre(&mut self, genre: Genre) {
        self.values.genre = genre;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.values.description = description.into();
    }

    pub fn set_copies(&mut self, copies: i64) {
        self.values.copies = copies;
        self.errors.clear(BookField::Copies);
    }

    /// Sets copies from raw input text, anything that is not a number becomes 0
    pub fn set_copies_input(&mut self, input: &str) {
        self.set_copies(parse_leading_integer(input));
    }

    /// Runs all book rules, returns true if the form can be submitted
    pub fn validate(&mut self) -> bool {
        self.errors.replace_with(validate_book(&self.draft()));
        self.errors.is_empty()
    }

    /// Payload sent on create and update, every field set
    pub fn draft(&self) -> BookDraft {
        BookDraft {
            title: Some(self.values.title.clone()),
            author: Some(self.values.author.clone()),
            genre: Some(self.values.genre),
            isbn: Some(self.values.isbn.clone()),
            description: Some(self.values.description.clone()),
            copies: Some(self.values.copies),
        }
    }

    /// True when a required value is missing, regardless of the error map
    pub fn missing_required(&self) -> bool {
        self.values.title.is_empty() || self.values.author.is_empty() || self.values.isbn.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct BorrowForm {
    quantity: i64,
    due_date: Option<NaiveDate>,
    errors: FieldErrors<BorrowField>,
}

impl BorrowForm {
    /// One copy, due [`DEFAULT_LOAN_DAYS`] after `today`
    pub fn new(today: NaiveDate) -> Self {
        Self {
            quantity: 1,
            due_date: today.checked_add_days(Days::new(DEFAULT_LOAN_DAYS)),
            errors: FieldErrors::default(),
        }
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn errors(&self) -> &FieldErrors<BorrowField> {
        &self.errors
    }

    pub fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
        self.errors.clear(BorrowField::Quantity);
    }

    /// Sets quantity from raw input text, anything that is not a number becomes 0
    pub fn set_quantity_input(&mut self, input: &str) {
        self.set_quantity(parse_leading_integer(input));
    }

    pub fn set_due_date(&mut self, due_date: Option<NaiveDate>) {
        self.due_date = due_date;
        self.errors.clear(BorrowField::DueDate);
    }

    /// Sets the due date from `YYYY-MM-DD` text, empty or malformed text clears it
    pub fn set_due_date_input(&mut self, input: &str) {
        self.set_due_date(NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok());
    }

    pub fn input(&self) -> BorrowInput {
        BorrowInput {
            quantity: self.quantity,
            due_date: self.due_date,
        }
    }

    /// Runs all borrow rules against the loaded book, returns true if the form can be submitted
    pub fn validate(&mut self, book: Option<&Book>, today: NaiveDate) -> bool {
        self.errors
            .replace_with(validate_borrow(&self.input(), book, today));
        self.errors.is_empty()
    }

    /// Request for `book_id`, `None` while quantity or due date cannot form one
    pub fn request(&self, book_id: &BookId) -> Option<BorrowRequest> {
        let quantity = u32::try_from(self.quantity).ok().filter(|&q| q >= 1)?;
        Some(BorrowRequest {
            book: book_id.clone(),
            quantity,
            due_date: self.due_date?,
        })
    }

    /// "1 copy" or "N copies"
    pub fn quantity_label(&self) -> String {
        if self.quantity == 1 {
            "1 copy".to_string()
        } else {
            format!("{} copies", self.quantity)
        }
    }
}

/// Reads an optional sign and the digits that follow it, 0 when there are none
fn parse_leading_integer(input: &str) -> i64 {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    match digits.parse::<i64>() {
        Ok(value) if negative => -value,
        Ok(value) => value,
        Err(_) => 0,
    }
}
