use std::time::Duration;

use anyhow::Context;
use reqwest::{StatusCode, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::{
    ApiResponse, Book, BookDraft, BorrowRequest, BorrowSummary, ListBooksParams,
};
use crate::error::ApiError;
use crate::repository::LibraryApi;
use crate::settings::ApiSettings;

/// HTTP client of the library service REST API
pub struct LibraryApiClient {
    url: Url,
    client: ClientWithMiddleware,
}

impl LibraryApiClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        Self::with_reqwest_client(url, reqwest_client)
    }

    pub fn from_settings(settings: &ApiSettings) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build reqwest client")?;
        Self::with_reqwest_client(&settings.base_url, reqwest_client)
    }

    fn with_reqwest_client(url: &str, reqwest_client: reqwest::Client) -> anyhow::Result<Self> {
        let url = Url::parse(url.trim_end_matches('/'))
            .with_context(|| format!("Invalid library service url {}", url))?;
        if url.cannot_be_a_base() {
            anyhow::bail!("Library service url {} cannot carry a path", url);
        }
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Base url extended by `segments`, each percent-encoded as a single path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport(format!("{} cannot carry a path", self.url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `.` and `..` would be dropped from the path, so no book can have them as id
    fn book_url(&self, book_id: &str) -> Result<Url, ApiError> {
        if matches!(book_id, "" | "." | "..") {
            return Err(ApiError::NotFound { message: None });
        }
        self.endpoint(&["books", book_id])
    }
}

#[async_trait::async_trait]
impl LibraryApi for LibraryApiClient {
    /// Calls GET /books with the non empty parameters as query string
    async fn list_books(&self, params: &ListBooksParams) -> Result<Vec<Book>, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&["books"])?)
            .query(params)
            .send()
            .await
            .map_err(transport_error)?;

        let envelope: ApiResponse<Vec<Book>> = read_envelope(response).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Calls GET /books/{id}
    /// A successful response without a book is treated as not found
    async fn get_book(&self, book_id: &str) -> Result<Book, ApiError> {
        let response = self
            .client
            .get(self.book_url(book_id)?)
            .send()
            .await
            .map_err(transport_error)?;

        let envelope: ApiResponse<Book> = read_envelope(response).await?;
        envelope.data.ok_or(ApiError::NotFound {
            message: Some(envelope.message),
        })
    }

    /// Calls POST /books
    async fn create_book(&self, draft: &BookDraft) -> Result<Book, ApiError> {
        let response = self
            .client
            .post(self.endpoint(&["books"])?)
            .json(draft)
            .send()
            .await
            .map_err(transport_error)?;

        let envelope: ApiResponse<Book> = read_envelope(response).await?;
        let book = envelope.data.ok_or_else(|| missing_data("create book"))?;
        tracing::info!("Created book {}", book.id);
        Ok(book)
    }

    /// Calls PUT /books/{id}
    async fn update_book(&self, book_id: &str, draft: &BookDraft) -> Result<Book, ApiError> {
        let response = self
            .client
            .put(self.book_url(book_id)?)
            .json(draft)
            .send()
            .await
            .map_err(transport_error)?;

        let envelope: ApiResponse<Book> = read_envelope(response).await?;
        let book = envelope.data.ok_or_else(|| missing_data("update book"))?;
        tracing::info!("Updated book {}", book.id);
        Ok(book)
    }

    /// Calls DELETE /books/{id}
    async fn delete_book(&self, book_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.book_url(book_id)?)
            .send()
            .await
            .map_err(transport_error)?;

        let _: ApiResponse<serde_json::Value> = read_envelope(response).await?;
        tracing::info!("Deleted book {}", book_id);
        Ok(())
    }

    /// Calls POST /borrow
    async fn borrow_book(&self, request: &BorrowRequest) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.endpoint(&["borrow"])?)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let _: ApiResponse<serde_json::Value> = read_envelope(response).await?;
        tracing::info!(
            "Borrowed {} copies of book {} until {}",
            request.quantity,
            request.book,
            request.due_date
        );
        Ok(())
    }

    /// Calls GET /borrow
    async fn borrow_summary(&self) -> Result<Vec<BorrowSummary>, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&["borrow"])?)
            .send()
            .await
            .map_err(transport_error)?;

        let envelope: ApiResponse<Vec<BorrowSummary>> = read_envelope(response).await?;
        Ok(envelope.data.unwrap_or_default())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Turns a response into its envelope, mapping error statuses and
/// `success: false` bodies to `ApiError` with the service message kept
async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<ApiResponse<T>, ApiError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|error| error.message);
        tracing::warn!("Library service answered {}: {:?}", status, message);
        return Err(if status == StatusCode::NOT_FOUND {
            ApiError::NotFound { message }
        } else {
            ApiError::Rejected {
                status: status.as_u16(),
                message,
            }
        });
    }

    let envelope: ApiResponse<T> =
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))?;
    if !envelope.success {
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message: Some(envelope.message),
        });
    }
    Ok(envelope)
}

fn transport_error(err: impl std::fmt::Display) -> ApiError {
    tracing::error!("Library service request failed {}", err);
    ApiError::Transport(err.to_string())
}

fn missing_data(operation: &str) -> ApiError {
    ApiError::Decode(format!("{} response carried no data", operation))
}
