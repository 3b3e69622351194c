//! Error types for request orchestration.

use thiserror::Error;

/// Result type alias for studio operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Upstream bodies longer than this are cut before being surfaced.
const MAX_BODY_CHARS: usize = 1024;

/// Error type for studio operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed caller input. Never retried.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Neither the request nor the deployment supplied a credential.
    #[error("API key not found: provide api_key in the request or set BRIA_API_KEY")]
    Unauthenticated,

    /// The provider refused the credential (401 or 403).
    #[error("provider rejected the API key: http {status}: {body}")]
    CredentialRejected { status: u16, body: String },

    /// Non-2xx response from the provider.
    #[error("provider returned http {status}: {body}")]
    Provider { status: u16, body: String },

    /// A required pre-step failed, so the main call was not made.
    #[error("upstream dependency failed: {0}")]
    UpstreamDependencyFailed(String),

    /// The provider answered 2xx with a body no known shape matches.
    #[error("could not parse provider response: unrecognized response shape")]
    UnrecognizedResponse,

    /// The provider could not be reached.
    #[error("provider unreachable: {0}")]
    Transport(String),

    /// Polling was requested for a batch that does not exist.
    #[error("no pending results for {0}")]
    NoPendingBatch(String),
}

impl Error {
    /// Returns the HTTP status a caller-facing layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidRequest(_) => 400,
            Error::Unauthenticated | Error::CredentialRejected { .. } => 401,
            Error::NoPendingBatch(_) => 404,
            Error::Provider { .. }
            | Error::UpstreamDependencyFailed(_)
            | Error::UnrecognizedResponse => 502,
            Error::Transport(_) => 503,
        }
    }

    /// Returns true for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidRequest(msg.into())
    }
}

impl From<visionary_bria::Error> for Error {
    fn from(err: visionary_bria::Error) -> Self {
        let rejected = err.is_unauthorized();
        match err {
            visionary_bria::Error::Api { http_status, body } if rejected => {
                Error::CredentialRejected {
                    status: http_status,
                    body: truncate(body),
                }
            }
            visionary_bria::Error::Api { http_status, body } => Error::Provider {
                status: http_status,
                body: truncate(body),
            },
            visionary_bria::Error::Json(_) => Error::UnrecognizedResponse,
            visionary_bria::Error::Config(msg) => Error::InvalidRequest(msg),
            visionary_bria::Error::Http(e) => Error::Transport(e.to_string()),
            visionary_bria::Error::Other(msg) => Error::Transport(msg),
        }
    }
}

fn truncate(mut body: String) -> String {
    if let Some((idx, _)) = body.char_indices().nth(MAX_BODY_CHARS) {
        body.truncate(idx);
        body.push_str("...");
    }
    body
}
