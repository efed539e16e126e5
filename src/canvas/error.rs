use thiserror::Error;

/// A JSON record from Canvas that lacks a field the sync core needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {kind} record: missing or invalid field `{field}`")]
pub struct MalformedRecordError {
    pub kind: &'static str,
    pub field: &'static str,
}

/// Failures talking to the Canvas API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status} from {path}")]
    HttpStatus { status: u16, path: String },

    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        source: reqwest::Error,
    },

    #[error("unexpected response body from {path}: {reason}")]
    Body { path: String, reason: String },

    #[error("download from {path} returned no content")]
    EmptyPayload { path: String },

    #[error("item has no download URL")]
    NoDownloadUrl,

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

impl ApiError {
    /// Rate limits, server errors and transport failures are worth another
    /// attempt; everything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            ApiError::Transport { .. } => true,
            ApiError::Body { .. }
            | ApiError::EmptyPayload { .. }
            | ApiError::NoDownloadUrl
            | ApiError::Url(_)
            | ApiError::Client(_) => false,
        }
    }

    /// HTTP status carried by this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
