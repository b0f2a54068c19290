//! Error types for directory operations.

use thiserror::Error;

/// Result type alias using `DirectoryError`.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors returned by a [`DirectoryPort`](crate::DirectoryPort).
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The addressed group (or its member list/settings) does not exist.
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// The directory answered with a non-success status.
    #[error("Directory API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Request was throttled by the directory.
    #[error("Rate limit exceeded (retry after {retry_after_secs:?} seconds)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Authentication or token error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Client configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The directory answered with data this client does not understand.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Retries for a transient failure were exhausted.
    #[error("Giving up after {attempts} attempts: {last}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        last: Box<DirectoryError>,
    },
}

impl DirectoryError {
    /// Shorthand for a not-found error on `resource`.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Whether the error means the addressed resource does not exist yet.
    ///
    /// Reconciliation treats this class as benign: the dependent step is
    /// skipped instead of aborting the run.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Whether the resource being created already exists.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { status: 409, .. })
    }

    /// Server-provided delay hint, if any.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        }
    }
}
