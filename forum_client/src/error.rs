use thiserror::Error;

/// Client-side API error.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation: {0}")]
    Validation(String),

    /// Generation was refused because no API key was configured or sent.
    #[error("an API key is required: {0}")]
    NeedsApiKey(String),

    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("decode: {0}")]
    Decode(String),

    /// The HTTP client itself could not be configured.
    #[error("http client setup: {0}")]
    Setup(#[source] reqwest::Error),

    /// The server could not be reached and nothing usable was cached.
    #[error("offline: {0}")]
    Offline(#[source] reqwest::Error),
}
