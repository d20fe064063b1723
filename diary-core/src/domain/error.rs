use thiserror::Error;

use super::EntryId;

/// Errors reported by (or while talking to) the entry store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("could not reach the entry store: {0}")]
    Transport(String),
    /// The store answered with an error; `message` is its own wording.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("entry not found: {0}")]
    NotFound(EntryId),
    #[error("unexpected store response: {0}")]
    Parse(String),
}

/// Errors while verifying a credential that are not a rejection of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("verification service unreachable: {0}")]
    Transport(String),
    #[error("server misconfigured")]
    Misconfigured,
    #[error("verification failed ({status}): {message}")]
    Server { status: u16, message: String },
}

/// Errors surfaced by listing and mutation operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ListingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
