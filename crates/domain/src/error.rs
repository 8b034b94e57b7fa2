//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// What kind of thing a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    Equipment,
    Room,
    Reader,
    Tag,
    Request,
}

impl NotFoundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotFoundKind::Equipment => "Equipment",
            NotFoundKind::Room => "Room",
            NotFoundKind::Reader => "Reader",
            NotFoundKind::Tag => "Tag",
            NotFoundKind::Request => "Location change request",
        }
    }
}

impl std::fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors returned by every core operation.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found: {1}")]
    NotFound(NotFoundKind, String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl DomainError {
    pub fn not_found(kind: NotFoundKind, key: impl Into<String>) -> Self {
        DomainError::NotFound(kind, key.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::Validation(shared::validation::describe_validation_errors(&errors))
    }
}

/// Errors reported by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: NotFoundKind, key: String },

    #[error("equipment {0} was modified concurrently")]
    VersionConflict(Uuid),

    #[error("duplicate value for {0}")]
    Duplicate(String),

    #[error("equipment {0} already has a pending location change request")]
    PendingRequestExists(Uuid),

    #[error("location change request {0} is no longer pending")]
    RequestNotPending(Uuid),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, key } => DomainError::NotFound(kind, key),
            StoreError::VersionConflict(_) => DomainError::Conflict(
                "Equipment was modified by another operation; reload and retry".to_string(),
            ),
            StoreError::Duplicate(field) => {
                DomainError::Conflict(format!("Another equipment already uses this {}", field))
            }
            StoreError::PendingRequestExists(_) => DomainError::Conflict(
                "A location change request is already pending for this equipment".to_string(),
            ),
            StoreError::RequestNotPending(_) => DomainError::Conflict(
                "Location change request has already been reviewed".to_string(),
            ),
            StoreError::Backend(message) => DomainError::Persistence(message),
        }
    }
}
