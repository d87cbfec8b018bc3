//! Error types for the Konfuzio SDK.
//!
//! Every operation in the library returns [`Result`]. The variants mirror the
//! ways a call against the Konfuzio server can fail, so callers can match on
//! the kind (for example to re-prompt for credentials on
//! [`Error::Authentication`]) instead of inspecting message strings.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for SDK operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The server rejected the token (401..=403). Never retried.
    #[error("Problem with credentials: {0}")]
    Authentication(String),

    /// The server kept answering 500 until the retry budget ran out.
    #[error("Problem with server: {detail} even after {attempts} retries")]
    Server { attempts: u32, detail: String },

    /// Any other failure that persisted for the whole retry budget.
    #[error("Unknown issue even after {attempts} retries: {detail}")]
    RetryExhausted { attempts: u32, detail: String },

    /// A download returned an error status or content that is not a PDF or image.
    #[error("File not found: {0}")]
    NotFound(String),

    /// Expected a local file that does not exist.
    #[error("File expected but not found at: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Local file exists but is empty.
    #[error("Please check your file with size {size} at {}", .path.display())]
    EmptyFile { path: PathBuf, size: u64 },

    /// File type or content that the SDK cannot handle.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// A write was answered with an error status.
    #[error("Request to {url} failed with {status}: {detail}")]
    Request {
        url: String,
        status: StatusCode,
        detail: String,
    },

    /// The server answered with a status other than the one the endpoint promises.
    #[error("Unexpected status from {url}: expected {expected}, got {actual}")]
    UnexpectedStatus {
        url: String,
        expected: StatusCode,
        actual: StatusCode,
    },

    /// The server answered successfully but with a body of the wrong shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Username/password were refused when requesting a token.
    #[error("Your credentials are not correct! Please run init again and provide the correct credentials.")]
    Credentials,

    /// The project id typed during `init` is not one of the listed projects.
    #[error("The ID that you provided ({0}) is not valid. Please run init again.")]
    InvalidProject(String),

    /// An endpoint needs a project id but none is configured.
    #[error("No project configured, set KONFUZIO_PROJECT_ID or run init")]
    MissingProjectId,

    /// The host page did not set a `csrftoken` cookie.
    #[error("No CSRF token returned by {0}")]
    MissingCsrfToken(String),

    /// A configuration value could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The token contains characters that cannot be sent in a header.
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL could not be parsed or joined.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure came from the server refusing the token.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }
}
