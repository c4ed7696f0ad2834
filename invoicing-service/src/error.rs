//! Domain errors for invoicing-service.

use service_core::error::AppError;
use thiserror::Error;

/// Rule violations raised by the financial engine before any state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidStateTransition(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(_) | DomainError::InvalidInput(_) => {
                AppError::Validation(err.to_string())
            }
            DomainError::InvalidStateTransition(msg) => AppError::InvalidStateTransition(msg),
        }
    }
}
