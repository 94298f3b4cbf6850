// Error types for the hubcache client.
// Covers transport, cache storage, and HTTP status mapping errors.

use thiserror::Error;

/// Errors surfaced by the client, cache store, and iterators.
///
/// Variants carry owned strings rather than the underlying reqwest/io
/// errors so that iterators can hold a sticky copy of the failure and
/// replay it on every subsequent call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("cache storage error: {0}")]
    Storage(String),

    #[error("cache file is corrupt: {0}")]
    CorruptCache(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("missing GITHUB_TOKEN environment variable")]
    MissingToken,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
