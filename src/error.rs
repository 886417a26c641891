//! Error types for domstate operations.

use thiserror::Error;

/// Error raised by a user-supplied reader or writer closure.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while reading from or writing to a document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("unknown shortcut: {0:?}")]
    UnknownShortcut(String),

    #[error("reader for key {key:?} failed: {source}")]
    ReaderFailed {
        key: String,
        #[source]
        source: CallbackError,
    },

    #[error("writer for key {key:?} failed: {source}")]
    WriterFailed {
        key: String,
        #[source]
        source: CallbackError,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
