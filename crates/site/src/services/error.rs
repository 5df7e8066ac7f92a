//! Service layer errors.

use thiserror::Error;

use ritwrites_core::ValidationError;

use super::access::AccessError;
use crate::db::RepositoryError;

/// Errors returned by the content and settings services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The session may not perform this action.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Submitted data is incomplete or malformed.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The target record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Database operation failed.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl ServiceError {
    /// Map a repository error, naming the record for `NotFound`.
    pub(crate) fn from_repository(e: RepositoryError, what: &'static str) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound(what),
            other => Self::Repository(other),
        }
    }
}
