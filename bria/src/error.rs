//! Error types for the Bria API client.

use thiserror::Error;

/// Result type alias for Bria operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Bria API operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Non-2xx response returned by Bria.
    #[error("bria: http {http_status}: {body}")]
    Api { http_status: u16, body: String },

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a new API error.
    pub fn api(http_status: u16, body: impl Into<String>) -> Self {
        Error::Api {
            http_status,
            body: body.into(),
        }
    }

    /// Returns the upstream HTTP status, if this error carries one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Api { http_status, .. } => Some(*http_status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if the credential was rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.http_status(), Some(401) | Some(403))
    }

    /// Returns true if the provider's content moderation refused the input.
    pub fn is_content_moderation(&self) -> bool {
        self.http_status() == Some(422)
    }

    /// Returns true if this is a server-side error.
    pub fn is_server_error(&self) -> bool {
        matches!(self.http_status(), Some(s) if s >= 500)
    }
}
