#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// The service answered 404, `message` is whatever it said about it
    #[error("Resource not found: {}", .message.as_deref().unwrap_or("no message"))]
    NotFound { message: Option<String> },

    #[error("Request rejected with status {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    #[error("Failed to reach library service: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    /// Message provided by the service, if it sent one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::NotFound { message } | ApiError::Rejected { message, .. } => {
                message.as_deref().filter(|message| !message.is_empty())
            }
            _ => None,
        }
    }

    /// Text to show the user: the service message verbatim, or `fallback`
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

#[cfg(test)]
mod error_tests {
    use super::ApiError;

    #[test]
    fn server_message_is_preferred_over_fallback() {
        let err = ApiError::Rejected {
            status: 409,
            message: Some("ISBN already exists".to_string()),
        };
        assert_eq!(err.user_message("Failed to create book"), "ISBN already exists");
    }

    #[test]
    fn fallback_is_used_without_server_message() {
        let err = ApiError::Transport("connection refused".to_string());
        assert_eq!(err.user_message("Failed to create book"), "Failed to create book");

        let err = ApiError::NotFound {
            message: Some(String::new()),
        };
        assert_eq!(
            err.user_message("Error loading book details."),
            "Error loading book details."
        );
        assert!(err.is_not_found());
    }
}
