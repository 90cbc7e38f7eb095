// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for prediction pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the prediction core.
///
/// Collaborator failures are always propagated. An empty suggestion list is a
/// legitimate answer, so it is never used to paper over one of these.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input to a core call (empty dictionary key, bad entry, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Language id not present in the loaded rule sets, or an empty language set.
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    /// The scoring model raised or returned a malformed score vector.
    #[error("model invocation failed: {0}")]
    ModelInvocation(String),

    /// The tokenizer failed to encode or decode.
    #[error("tokenizer failure: {0}")]
    Tokenizer(String),

    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("could not persist {path}: {message}")]
    Persistence { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Config { path: path.into(), message: message.into() }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Persistence { path: path.into(), message: message.to_string() }
    }
}
