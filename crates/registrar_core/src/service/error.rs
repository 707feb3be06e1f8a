//! Service-level error taxonomy.

use crate::model::attachment::AttachmentId;
use crate::model::audit::{EntityKind, RecordId};
use crate::model::validation::ValidationErrors;
use crate::repo::record_repo::RepoError;
use crate::storage::BlobError;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by service operations to outer layers.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Field-level input problems, detected before any mutation.
    #[error(transparent)]
    Validation(ValidationErrors),
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: RecordId },
    #[error("attachment not found: {0}")]
    AttachmentNotFound(AttachmentId),
    /// Metadata exists but the stored bytes are gone.
    #[error("file of attachment {0} is missing from storage")]
    FileMissing(AttachmentId),
    #[error("{0}")]
    Conflict(String),
    /// Content store failure; the enclosing unit was rolled back.
    #[error("storage failure: {0}")]
    Io(#[source] BlobError),
    #[error(transparent)]
    Repo(RepoError),
}

impl ServiceError {
    /// Whether the error belongs to the not-found family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::AttachmentNotFound(_) | Self::FileMissing(_)
        )
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(errors) => Self::Validation(errors),
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            RepoError::AttachmentNotFound(id) => Self::AttachmentNotFound(id),
            RepoError::Conflict(message) => Self::Conflict(message),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<BlobError> for ServiceError {
    fn from(value: BlobError) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}
