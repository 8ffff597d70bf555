use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    parse_phone, parse_role, validate_email, validate_name, validate_password,
};
use crate::auth::accounts::{self, Registration};
use crate::auth::{session, AuthenticatedUser};
use crate::db::{
    LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, RegisterResponse, RegisteredUser,
};
use crate::AppState;

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let issued = session::login(
        state.users.as_ref(),
        state.sessions.as_ref(),
        &state.signer,
        &request.email,
        &request.password,
    )
    .await?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successfully!!".to_string(),
        token: issued.token,
    }))
}

/// Check a registration body field by field, reporting every failure at once
fn validate_registration(request: RegisterRequest) -> Result<Registration, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    let first_name = request.first_name.unwrap_or_default();
    let last_name = request.last_name.unwrap_or_default();
    let email = request.email.unwrap_or_default();
    let password = request.password.unwrap_or_default();

    errors.check("firstName", validate_name(&first_name, "First name"));
    errors.check("lastName", validate_name(&last_name, "Last name"));
    errors.check("email", validate_email(&email));
    errors.check("password", validate_password(&password));

    let phone_number = match request.phone_number.as_ref().map(parse_phone) {
        Some(Ok(number)) => Some(number),
        Some(Err(message)) => {
            errors.add("phoneNumber", message);
            None
        }
        None => {
            errors.add("phoneNumber", "Phone number is required");
            None
        }
    };

    let role = match parse_role(request.role.as_deref()) {
        Ok(role) => Some(role),
        Err(message) => {
            errors.add("role", message);
            None
        }
    };

    errors.finish()?;

    match (phone_number, role) {
        (Some(phone_number), Some(role)) => Ok(Registration {
            first_name,
            last_name,
            email,
            phone_number,
            password,
            role,
        }),
        _ => Err(ApiError::bad_request("Invalid registration request")),
    }
}

/// Registration endpoint
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let registration = validate_registration(request)?;
    let user = accounts::register(state.users.as_ref(), registration).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: RegisteredUser {
                id: user.id,
                role: user.role,
            },
        }),
    ))
}

/// Logout endpoint. Deletes the stored session for the presented token.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, ApiError> {
    let token = extract_token(&headers);
    session::logout(state.sessions.as_ref(), token.as_deref()).await?;

    Ok(Json(LogoutResponse {
        success: true,
        message: "Logout successful".to_string(),
    }))
}

/// Extract the token from the Authorization header, with or without a
/// `Bearer ` prefix
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?
        .trim();

    // A bare "Bearer" scheme carries no token
    let token = match value.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => value,
    };
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Extractor that admits a request only with a live session
#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let token = extract_token(&parts.headers);
        let user =
            session::authenticate(&state.signer, state.sessions.as_ref(), token.as_deref()).await?;

        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
