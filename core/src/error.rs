//! Error types for Huddle Core

use crate::auth::AuthErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote side did not answer in time.
    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Failed to fetch {endpoint} after {attempts} attempts: {reason}")]
    Fetch {
        endpoint: String,
        attempts: u32,
        reason: String,
    },

    #[error("{message}")]
    Auth {
        code: AuthErrorCode,
        message: String,
    },

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Empty message")]
    EmptyMessage,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for failures caused by a deadline rather than by the remote answer.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Http(e.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(e: tokio::time::error::Elapsed) -> Self {
        Error::Timeout(e.to_string())
    }
}
