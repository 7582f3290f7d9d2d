use thiserror::Error;
use serde::Serialize;

#[derive(Error, Debug, Serialize)]
pub enum AppError {
    #[error("I/O Error: {0}")]
    Io(String),

    #[error("Network Error: {0}")]
    Network(String),

    #[error("Config Error: {0}")]
    Config(String),

    #[error("Clipboard Error: {0}")]
    Clipboard(String),

    #[error("Index {index} is out of range (history holds {len} entries)")]
    OutOfRange { index: usize, len: usize },

    #[error("Session Error: {0}")]
    Session(String),
}

// Implement conversion from standard errors
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(format!("Serialization error: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Failure kinds a translation request can resolve with.
///
/// These are reported to the caller as data inside
/// [`TranslationOutcome::Error`](crate::shared::types::TranslationOutcome)
/// and are never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TranslateErrorKind {
    /// Non-success HTTP status or transport failure
    Backend,
    /// Extraction produced nothing usable
    EmptyResult,
    /// Payload could not be parsed into the expected shape
    MalformedResponse,
}

impl std::fmt::Display for TranslateErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslateErrorKind::Backend => write!(f, "backend"),
            TranslateErrorKind::EmptyResult => write!(f, "empty result"),
            TranslateErrorKind::MalformedResponse => write!(f, "malformed response"),
        }
    }
}

/// Errors raised at the backend seam.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Translation API request failed: {status}")]
    Status { status: u16, body: String },

    #[error("Translation error: {0}")]
    Transport(String),

    #[error("Error parsing translation response: {0}")]
    Malformed(String),
}

impl BackendError {
    pub fn kind(&self) -> TranslateErrorKind {
        match self {
            BackendError::Status { .. } | BackendError::Transport(_) => TranslateErrorKind::Backend,
            BackendError::Malformed(_) => TranslateErrorKind::MalformedResponse,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}
