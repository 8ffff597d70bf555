use thiserror::Error;

use crate::db::{StoreError, UniqueField};

/// Failures of the auth core.
///
/// The display strings are the user-visible messages. `Internal` carries
/// diagnostic detail that must only reach the logs.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, wrong password, or a deleted account
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is not active")]
    AccountInactive,

    #[error("User has been deleted")]
    AccountDeleted,

    #[error("Access denied. No token provided.")]
    Unauthenticated,

    #[error("Invalid token")]
    InvalidToken,

    /// Signature is fine but the session is no longer stored
    #[error("Token expired or logged out. Please log in again.")]
    SessionRevoked,

    #[error("Token is required for logout")]
    MissingToken,

    #[error("Invalid token or already logged out")]
    AlreadyLoggedOut,

    #[error("Email already exists")]
    EmailConflict,

    #[error("Phone number already exists")]
    PhoneConflict,

    #[error("User not found")]
    NotFound,

    #[error("User already deleted")]
    AlreadyDeleted,

    #[error("{message}")]
    ValidationFailure { field: &'static str, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationFailure {
            field,
            message: message.into(),
        }
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::Internal(detail.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(UniqueField::Email) => AuthError::EmailConflict,
            StoreError::Conflict(UniqueField::PhoneNumber) => AuthError::PhoneConflict,
            StoreError::Database(e) => AuthError::internal(e),
        }
    }
}
