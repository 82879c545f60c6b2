//! Error types for bt-core
//!
//! Every backend operation and every stage of the sync engine reports
//! failures through [`Error`]. The CLI maps the whole taxonomy onto a
//! single failure exit code at its top-level handler.

use thiserror::Error;

/// Result type alias using the bt-core error
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for backend operations and the sync engine
#[derive(Error, Debug)]
pub enum Error {
    /// Problem caused by the user's input (bad arguments, refused overwrite, ...)
    #[error("{0}")]
    User(String),

    /// Backend URL could not be parsed or is missing required parts
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// The protocol has no registered backend
    #[error("Backend not supported: {0}")]
    UnsupportedBackend(String),

    /// Configuration file problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend's container (folder, bucket, prefix) does not exist
    #[error("Folder missing: {0}")]
    FolderMissing(String),

    /// A named file does not exist on the backend
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication or authorization failure
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Transport failure without a server response
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with an error response
    #[error("{message}")]
    Response {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// Operation the backend cannot perform
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A unit of work failed on every attempt of its retry budget
    #[error("Sync failed - retry count exceeded for '{name}' after {attempts} attempts")]
    RetryExhausted {
        name: String,
        attempts: u32,
        #[source]
        last: Box<Error>,
    },

    /// The run was cancelled between items or attempts
    #[error("Operation cancelled")]
    Cancelled,

    /// Unreachable state in the tool itself
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is the user's fault and deserves only a short message
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::User(_) | Error::InvalidUrl(_) | Error::UnsupportedBackend(_) | Error::Config(_)
        )
    }

    /// HTTP status of a server error response
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Response { status, .. } => *status,
            Error::RetryExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Whether the addressed file or container does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::Response { status: Some(404), .. }
        )
    }

    /// Drained response body attached to a transport error, if any
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Error::Response { body, .. } => body.as_deref().filter(|b| !b.is_empty()),
            Error::RetryExhausted { last, .. } => last.response_body(),
            _ => None,
        }
    }
}
