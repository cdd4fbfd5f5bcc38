//! Error taxonomy shared by the pipeline and its collaborators.

use thiserror::Error;

/// Result type for core and collaborator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure categories a submission or lookup can end in.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A work, report, content record, or blob does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The extractor cannot turn these bytes into plain text.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Content or metadata persistence failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed identifiers or request parameters.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The caller cancelled the operation before it completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn storage(msg: impl std::fmt::Display) -> Self {
        Error::Storage(msg.to_string())
    }

    /// Prefix the message with `ctx`, keeping the category.
    pub fn context(self, ctx: &str) -> Self {
        match self {
            Error::NotFound(m) => Error::NotFound(format!("{}: {}", ctx, m)),
            Error::UnsupportedFormat(m) => Error::UnsupportedFormat(format!("{}: {}", ctx, m)),
            Error::Storage(m) => Error::Storage(format!("{}: {}", ctx, m)),
            Error::Validation(m) => Error::Validation(format!("{}: {}", ctx, m)),
            Error::Cancelled => Error::Cancelled,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
