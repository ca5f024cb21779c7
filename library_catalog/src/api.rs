use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier assigned to a book by the library service
pub type BookId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Genre {
    #[default]
    Fiction,
    NonFiction,
    Science,
    History,
    Biography,
    Fantasy,
}

impl Genre {
    /// Every genre, in the order the genre filter offers them
    pub const ALL: [Genre; 6] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::Science,
        Genre::History,
        Genre::Biography,
        Genre::Fantasy,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Book record as returned by the library service
pub struct Book {
    #[serde(rename = "_id")]
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub copies: u32,
    /// Derived by the service from `copies`, passed through as received
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Partial book used as the body of create and update calls.
/// Fields left as `None` are omitted from the JSON and stay unchanged on update
pub struct BookDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copies: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub book: BookId,
    pub quantity: u32,
    /// Serialized as `YYYY-MM-DD`
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct BorrowedBook {
    pub title: String,
    pub isbn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Server computed total of all borrows of a single book
pub struct BorrowSummary {
    pub book: BorrowedBook,
    pub total_quantity: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Envelope wrapping every response of the library service
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>, error: Option<serde_json::Value>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    CreatedAt,
    Title,
    Author,
    Copies,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Default number of books requested by the listing page
pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
/// Query parameters of `GET /books`. Unset parameters are left out of the query string
pub struct ListBooksParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Genre>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Default for ListBooksParams {
    /// Newest books first, one page of [`DEFAULT_PAGE_SIZE`]
    fn default() -> Self {
        Self {
            filter: None,
            sort_by: Some(SortBy::CreatedAt),
            sort: Some(SortOrder::Desc),
            limit: Some(DEFAULT_PAGE_SIZE),
        }
    }
}

impl ListBooksParams {
    pub fn unfiltered() -> Self {
        Self {
            filter: None,
            sort_by: None,
            sort: None,
            limit: None,
        }
    }

    pub fn with_filter(self, genre: Genre) -> Self {
        Self {
            filter: Some(genre),
            ..self
        }
    }
}

#[cfg(test)]
mod api_tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;

    use super::*;

    #[test]
    fn book_uses_service_field_names() {
        let raw = json!({
            "_id": "6650c1f2a1b2c3d4e5f60718",
            "title": "Dune",
            "author": "Frank Herbert",
            "genre": "NON_FICTION",
            "isbn": "9780441013593",
            "copies": 3,
            "available": true,
            "createdAt": "2024-05-24T10:00:00.000Z",
            "updatedAt": "2024-05-24T10:00:00.000Z",
            "__v": 0
        });
        let book: Book = serde_json::from_value(raw).expect("Failed to parse book");

        assert_eq!(book.id, "6650c1f2a1b2c3d4e5f60718");
        assert_eq!(book.genre, Genre::NonFiction);
        assert_eq!(book.description, None);
        assert_eq!(
            book.created_at,
            Utc.with_ymd_and_hms(2024, 5, 24, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn draft_omits_unset_fields() {
        let draft = BookDraft {
            title: Some("Emma".to_string()),
            copies: Some(0),
            ..BookDraft::default()
        };
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({"title": "Emma", "copies": 0})
        );
    }

    #[test]
    fn borrow_request_serializes_due_date_as_plain_date() {
        let request = BorrowRequest {
            book: "abc".to_string(),
            quantity: 2,
            due_date: NaiveDate::from_ymd_opt(2024, 6, 7).unwrap(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"book": "abc", "quantity": 2, "dueDate": "2024-06-07"})
        );
    }

    #[test]
    fn null_data_is_accepted() {
        let response: ApiResponse<Book> = serde_json::from_value(json!({
            "success": true,
            "message": "Book deleted successfully",
            "data": null
        }))
        .unwrap();
        assert!(response.success);
        assert!(response.data.is_none());
    }

    #[test]
    fn default_list_params_match_listing_page() {
        let params = ListBooksParams::default();
        assert_eq!(params.sort_by, Some(SortBy::CreatedAt));
        assert_eq!(params.sort, Some(SortOrder::Desc));
        assert_eq!(params.limit, Some(50));
        assert_eq!(
            serde_json::to_value(params.with_filter(Genre::Fantasy)).unwrap(),
            json!({"filter": "FANTASY", "sortBy": "createdAt", "sort": "desc", "limit": 50})
        );
    }

    #[test]
    fn genres_use_screaming_snake_case_names() {
        let names: Vec<_> = Genre::ALL
            .iter()
            .map(|genre| serde_json::to_value(genre).unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                json!("FICTION"),
                json!("NON_FICTION"),
                json!("SCIENCE"),
                json!("HISTORY"),
                json!("BIOGRAPHY"),
                json!("FANTASY"),
            ]
        );
        for (genre, name) in Genre::ALL.iter().zip(names) {
            assert_eq!(&serde_json::from_value::<Genre>(name).unwrap(), genre);
        }
    }
}
