//! Domain errors for the belt monitoring core.

use thiserror::Error;

use crate::domain::models::{DefectId, LogRecordId, PhotoId};

/// Format a traversal path as a human-readable string: `7 -> 4 -> 2 -> 4`.
fn format_chain_path(path: &[DefectId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Coarse classification of a [`DomainError`], used by callers to pick a
/// client-visible response (HTTP status, CLI exit code, retry decision).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The referenced entity does not exist.
    NotFound,
    /// The operation would break a model invariant.
    Forbidden,
    /// Both defects exist but are not linked the way the caller claims.
    NotRelated,
    /// Input failed validation.
    Invalid,
    /// The store rejected the write because of a uniqueness or check constraint.
    Conflict,
    /// Data-integrity problem inside the store; never retried.
    Internal,
    /// Store or transport failure; the caller may retry.
    Transient,
}

impl ErrorCategory {
    /// Snake-case name for structured output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::NotRelated => "not_related",
            Self::Invalid => "invalid",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
            Self::Transient => "transient",
        }
    }
}

/// Domain-level errors that can occur in the belt monitoring core.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("There is no defect with id={0}")]
    DefectNotFound(DefectId),

    #[error("There is no photo with id={0}")]
    PhotoNotFound(PhotoId),

    #[error("There is no log record with id={0}")]
    LogRecordNotFound(LogRecordId),

    #[error("There is no relation between defects with id={previous} and id={current}")]
    VariationLinkNotFound { previous: DefectId, current: DefectId },

    #[error("Defects with id={previous} and id={current} are not related")]
    NotRelated { previous: DefectId, current: DefectId },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Variation chain cycle detected: {}", format_chain_path(.0))]
    CycleDetected(Vec<DefectId>),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Map the error onto the caller-facing taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DefectNotFound(_)
            | Self::PhotoNotFound(_)
            | Self::LogRecordNotFound(_)
            | Self::VariationLinkNotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidOperation(_) => ErrorCategory::Forbidden,
            Self::NotRelated { .. } => ErrorCategory::NotRelated,
            Self::ValidationFailed(_) => ErrorCategory::Invalid,
            Self::ConstraintViolation(_) => ErrorCategory::Conflict,
            Self::CycleDetected(_) | Self::SerializationError(_) => ErrorCategory::Internal,
            Self::DatabaseError(_) => ErrorCategory::Transient,
        }
    }

    /// Whether the error means something referenced does not exist.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Whether a caller may retry the failed operation unchanged.
    pub fn is_transient(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation()
                    || db_err.is_check_violation()
                    || db_err.is_foreign_key_violation() =>
            {
                DomainError::ConstraintViolation(db_err.message().to_string())
            }
            // RAISE(ABORT, ...) from the status-history trigger
            sqlx::Error::Database(db_err) if db_err.message().contains("conveyor status unchanged") => {
                DomainError::ConstraintViolation(db_err.message().to_string())
            }
            _ => DomainError::DatabaseError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
