use super::lifecycle::InvalidTransition;
use super::repository::RepositoryError;
use super::validation::ValidationError;

/// Why an actor was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("admin role required")]
    Forbidden,
}

/// Error raised by the directory services.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    InvalidState(#[from] InvalidTransition),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    /// Absent and not-yours are reported identically.
    #[error("record not found")]
    NotFound,
    #[error("directory store failure: {0}")]
    Infrastructure(RepositoryError),
}

impl From<RepositoryError> for DirectoryError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Infrastructure(other),
        }
    }
}
