//! Error types for Roster

use thiserror::Error;

use crate::directory::DirectoryError;

/// Result type alias for Roster operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Roster operations
///
/// The first five variants are the domain outcomes callers are expected to
/// handle. `Internal` wraps any data-layer failure that is not one of them.
#[derive(Error, Debug)]
pub enum Error {
    /// User, team or pull request does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Team name or pull request id is already taken
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Operation is not legal in the pull request's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The user to replace is not a reviewer of the pull request
    #[error("Reviewer {user_id} is not assigned to pull request {pr_id}")]
    NotAssigned { pr_id: String, user_id: String },

    /// No active replacement candidate is available
    #[error("No active replacement candidate for pull request {pr_id}")]
    NoCandidate { pr_id: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected data-layer failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DirectoryError> for Error {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(what) => Error::NotFound(what),
            DirectoryError::DuplicateKey(what) => Error::AlreadyExists(what),
            DirectoryError::Backend(msg) => Error::Internal(msg),
        }
    }
}

impl Error {
    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NOT_FOUND",
            Error::AlreadyExists(_) => "ALREADY_EXISTS",
            Error::InvalidState(_) => "PR_MERGED",
            Error::NotAssigned { .. } => "NOT_ASSIGNED",
            Error::NoCandidate { .. } => "NO_CANDIDATE",
            Error::Config(_) => "CONFIG",
            Error::Io(_) | Error::Internal(_) => "INTERNAL",
        }
    }
}
