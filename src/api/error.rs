use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Error reported by the backend through its `detail` field,
    /// suitable for showing to the user verbatim.
    #[error("{0}")]
    Backend(String),

    #[error("Unauthorized - token missing or rejected")]
    Unauthorized,

    /// The stored token expired; the request was never dispatched.
    #[error("Session expired, please log in again")]
    TokenExpired,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Shown when the backend gives us nothing better to display.
const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Deserialize)]
struct DetailBody {
    detail: String,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    /// Extract the backend's human-readable `detail` field, if the body
    /// carries one.
    fn detail_from_body(body: &str) -> Option<String> {
        serde_json::from_str::<DetailBody>(body)
            .ok()
            .map(|b| b.detail)
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = Self::detail_from_body(body);
        match status.as_u16() {
            401 => match detail {
                Some(d) => ApiError::Backend(d),
                None => ApiError::Unauthorized,
            },
            404 => ApiError::NotFound(detail.unwrap_or_else(|| Self::truncate_body(body))),
            500..=599 => ApiError::ServerError(Self::truncate_body(body)),
            _ => match detail {
                Some(d) => ApiError::Backend(d),
                None => {
                    ApiError::InvalidResponse(format!("Status {}: {}", status, Self::truncate_body(body)))
                }
            },
        }
    }

    /// Message fit for an error banner: backend details verbatim, a
    /// generic fallback for everything the user cannot act on.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Backend(detail) => detail.clone(),
            ApiError::NotFound(detail) => detail.clone(),
            _ => GENERIC_MESSAGE.to_string(),
        }
    }
}
