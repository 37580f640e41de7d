//! Error types for database operations

use roster_core::DirectoryError;
use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum Error {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Key is already taken
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Stored data could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Turn a unique-constraint failure into `Duplicate(what)`
    pub(crate) fn on_conflict(err: sqlx::Error, what: impl FnOnce() -> String) -> Self {
        if is_unique_violation(&err) {
            Error::Duplicate(what())
        } else {
            Error::Sqlx(err)
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

impl From<Error> for DirectoryError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(what) => DirectoryError::NotFound(what),
            Error::Duplicate(what) => DirectoryError::DuplicateKey(what),
            Error::Sqlx(sqlx::Error::RowNotFound) => DirectoryError::NotFound("row".to_string()),
            Error::Sqlx(e) if is_unique_violation(&e) => DirectoryError::DuplicateKey(e.to_string()),
            other => DirectoryError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_to_directory_errors() {
        assert!(matches!(
            DirectoryError::from(Error::NotFound("user u1".into())),
            DirectoryError::NotFound(what) if what == "user u1"
        ));
        assert!(matches!(
            DirectoryError::from(Error::Duplicate("team backend".into())),
            DirectoryError::DuplicateKey(_)
        ));
        assert!(matches!(
            DirectoryError::from(Error::Sqlx(sqlx::Error::RowNotFound)),
            DirectoryError::NotFound(_)
        ));
        assert!(matches!(
            DirectoryError::from(Error::Sqlx(sqlx::Error::PoolClosed)),
            DirectoryError::Backend(_)
        ));
    }
}
