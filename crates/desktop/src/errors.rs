//! Errors returned by the service facade.
//!
//! Domain failures keep their `DomainError` kind; storage failures are
//! folded into the nearest kind a caller can act on.

use thiserror::Error;

use expenseshare_auth::{AccountError, PasswordError};
use expenseshare_core::{DomainError, Money};
use expenseshare_infra::{AccountStoreError, DispatchError, EventStoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("split amounts sum to {actual} but the total is {expected}")]
    SplitMismatch { expected: Money, actual: Money },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    /// Storage, serialization or corrupted-history failure.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvalidInput(msg) => ServiceError::InvalidInput(msg),
            DomainError::SplitMismatch { expected, actual } => ServiceError::SplitMismatch { expected, actual },
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::InvalidInput(msg),
            DomainError::NotFound => ServiceError::NotFound("record".to_string()),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::Unauthorized => ServiceError::Unauthorized,
            DomainError::InvariantViolation(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<EventStoreError> for ServiceError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<DispatchError> for ServiceError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Domain(err) => err.into(),
            DispatchError::Concurrency(msg) => ServiceError::Conflict(msg),
            DispatchError::Store(err) => err.into(),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<AccountStoreError> for ServiceError {
    fn from(value: AccountStoreError) -> Self {
        match value {
            AccountStoreError::DuplicateUsername(name) => {
                ServiceError::Conflict(format!("username '{name}' is already taken"))
            }
            AccountStoreError::UnknownUser(id) => ServiceError::NotFound(format!("user {id}")),
            AccountStoreError::SelfFriendship => {
                ServiceError::InvalidInput("you cannot add yourself as a friend".to_string())
            }
            AccountStoreError::Storage(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<AccountError> for ServiceError {
    fn from(value: AccountError) -> Self {
        match value {
            AccountError::Domain(err) => err.into(),
            AccountError::Password(PasswordError::Mismatch) => ServiceError::Unauthorized,
            AccountError::Password(other) => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<csv::Error> for ServiceError {
    fn from(value: csv::Error) -> Self {
        ServiceError::Internal(format!("csv export failed: {value}"))
    }
}
