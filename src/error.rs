/// Unified error types for the keyserver gateway
use crate::backend::BackendError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for lookups and server setup
#[derive(Error, Debug)]
pub enum KeyserverError {
    /// Malformed identity name or search term
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown or expired identity, or no upstream result
    #[error("Not found: {0}")]
    NotFound(String),

    /// Naming backend transport or internal failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Record value present but not a JSON object
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Record has neither gpg.fpr nor fpr
    #[error("No fingerprint found in {0}")]
    NoFingerprint(String),

    /// Fingerprint is not hex or too short
    #[error("Bad fingerprint: {0}")]
    BadFingerprint(String),

    /// Cached fingerprint no longer matches the current record
    #[error("Fingerprint mismatch, out of date? Cached {cached}, current {current}")]
    StaleCache { cached: String, current: String },

    /// Fetched key bytes do not carry the expected fingerprint
    #[error("Fingerprint mismatch: expected {expected}, got {actual}")]
    FingerprintMismatch { expected: String, actual: String },

    /// Operation other than index or get
    #[error("Not implemented: {0}")]
    UnsupportedOperation(String),

    /// Custom URI and standard keyserver both failed, or proxying failed
    #[error("Upstream fetch error: {0}")]
    UpstreamFetch(String),

    /// Internal errors (startup, configuration)
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeyserverError {
    /// HTTP status for this failure kind
    pub fn status(&self) -> StatusCode {
        match self {
            KeyserverError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            KeyserverError::NotFound(_) => StatusCode::NOT_FOUND,
            KeyserverError::MalformedRecord(_)
            | KeyserverError::NoFingerprint(_)
            | KeyserverError::BadFingerprint(_)
            | KeyserverError::FingerprintMismatch { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            KeyserverError::Backend(_) | KeyserverError::UpstreamFetch(_) => {
                StatusCode::BAD_GATEWAY
            }
            KeyserverError::StaleCache { .. } => StatusCode::SERVICE_UNAVAILABLE,
            KeyserverError::UnsupportedOperation(_) => StatusCode::NOT_IMPLEMENTED,
            KeyserverError::Internal(_) | KeyserverError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<BackendError> for KeyserverError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound => KeyserverError::NotFound("Name not found.".to_string()),
            other => KeyserverError::Backend(other.to_string()),
        }
    }
}

/// Convert KeyserverError to a plain-text HTTP response
impl IntoResponse for KeyserverError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            KeyserverError::Internal(_) | KeyserverError::Io(_) => {
                "Internal server error".to_string() // Don't leak details
            }
            other => other.to_string(),
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

/// Result type alias for keyserver operations
pub type KeyserverResult<T> = Result<T, KeyserverError>;
