//! Unified API error handling.
//!
//! Every failure is returned as a JSON envelope with a machine-readable code,
//! a human-readable message and, for validation failures, per-field details.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::auth::AuthError;

/// Error codes for API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Client errors (4xx)
    BadRequest,
    ValidationError,
    InvalidCredentials,
    AccountInactive,
    AccountDeleted,
    Unauthenticated,
    InvalidToken,
    SessionRevoked,
    AlreadyLoggedOut,
    EmailConflict,
    PhoneConflict,
    NotFound,
    AlreadyDeleted,

    // Server errors (5xx)
    InternalError,
}

impl ErrorCode {
    /// Get the default HTTP status code for this error code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ErrorCode::AccountInactive => StatusCode::FORBIDDEN,
            ErrorCode::AccountDeleted => StatusCode::GONE,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ErrorCode::SessionRevoked => StatusCode::UNAUTHORIZED,
            ErrorCode::AlreadyLoggedOut => StatusCode::BAD_REQUEST,
            ErrorCode::EmailConflict => StatusCode::CONFLICT,
            ErrorCode::PhoneConflict => StatusCode::CONFLICT,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::AlreadyDeleted => StatusCode::BAD_REQUEST,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the string representation of the error code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::InvalidCredentials => "invalid_credentials",
            ErrorCode::AccountInactive => "account_inactive",
            ErrorCode::AccountDeleted => "account_deleted",
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::InvalidToken => "invalid_token",
            ErrorCode::SessionRevoked => "session_revoked",
            ErrorCode::AlreadyLoggedOut => "already_logged_out",
            ErrorCode::EmailConflict => "email_conflict",
            ErrorCode::PhoneConflict => "phone_conflict",
            ErrorCode::NotFound => "not_found",
            ErrorCode::AlreadyDeleted => "already_deleted",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// The error envelope returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Field-level validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<HashMap<String, Vec<String>>>,
}

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    status: StatusCode,
    message: String,
    errors: Option<HashMap<String, Vec<String>>>,
}

impl ApiError {
    /// Create a new API error with a specific code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: code.status_code(),
            code,
            message: message.into(),
            errors: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Bad request error (400)
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Validation error (400) with field-level details
    pub fn validation(errors: HashMap<String, Vec<String>>) -> Self {
        let message = if errors.len() == 1 {
            errors
                .values()
                .next()
                .and_then(|v| v.first())
                .cloned()
                .unwrap_or_else(|| "Validation failed".to_string())
        } else {
            format!("Validation failed for {} fields", errors.len())
        };

        let mut err = Self::new(ErrorCode::ValidationError, message);
        err.errors = Some(errors);
        err
    }

    /// Single field validation error
    pub fn validation_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Self::validation(errors)
    }

    /// Internal server error (500)
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let response = ErrorResponse {
            success: false,
            code: self.code.as_str().to_string(),
            message: self.message,
            errors: self.errors,
        };

        (self.status, Json(response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = match &err {
            AuthError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AuthError::AccountInactive => ErrorCode::AccountInactive,
            AuthError::AccountDeleted => ErrorCode::AccountDeleted,
            AuthError::Unauthenticated => ErrorCode::Unauthenticated,
            AuthError::InvalidToken => ErrorCode::InvalidToken,
            AuthError::SessionRevoked => ErrorCode::SessionRevoked,
            AuthError::MissingToken => ErrorCode::BadRequest,
            AuthError::AlreadyLoggedOut => ErrorCode::AlreadyLoggedOut,
            AuthError::EmailConflict => ErrorCode::EmailConflict,
            AuthError::PhoneConflict => ErrorCode::PhoneConflict,
            AuthError::NotFound => ErrorCode::NotFound,
            AuthError::AlreadyDeleted => ErrorCode::AlreadyDeleted,
            AuthError::ValidationFailure { field, message } => {
                return ApiError::validation_field(field, message.clone());
            }
            AuthError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                return ApiError::internal("Internal Server Error");
            }
        };
        ApiError::new(code, err.to_string())
    }
}

/// Builder for collecting multiple validation errors
#[derive(Debug, Default)]
pub struct ValidationErrorBuilder {
    errors: HashMap<String, Vec<String>>,
}

impl ValidationErrorBuilder {
    /// Create a new validation error builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation error for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Record the error of a `Result`-returning field check, if any
    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.add(field, message);
        }
        self
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Build the ApiError if there are any errors
    pub fn build(self) -> Option<ApiError> {
        if self.errors.is_empty() {
            None
        } else {
            Some(ApiError::validation(self.errors))
        }
    }

    /// Return Ok(()) if no errors, or Err(ApiError) if there are errors
    pub fn finish(self) -> Result<(), ApiError> {
        match self.build() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
