//! Error types for content API operations.

/// Result type alias for content API operations.
pub type Result<T> = std::result::Result<T, ContentError>;

/// Errors raised while talking to the content API.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint or cursor could not be parsed as a URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The API answered with a non-success status.
    #[error("Content API returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body, for the logs.
        body: String,
    },

    /// A ref (preview token) was rejected by the API.
    #[error("Ref rejected by the content API")]
    RefRejected,

    /// The repository answered without a master ref.
    #[error("Repository has no master ref")]
    NoMasterRef,

    /// A document lacks a field we cannot render without.
    #[error("Document {id} is missing `{field}`")]
    MissingField {
        /// Upstream document id.
        id: String,
        /// Name of the missing field.
        field: &'static str,
    },
}

impl ContentError {
    /// Creates a missing-field error for a document.
    #[must_use]
    pub fn missing(id: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            id: id.into(),
            field,
        }
    }
}
