use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_name, validate_uuid};
use crate::auth::{accounts, AuthenticatedUser};
use crate::db::{
    DeleteProfileResponse, UpdateProfileResponse, UserListQuery, UserListResponse, UserPatch,
    UserResponse,
};
use crate::AppState;

/// List accounts with presence, filtered and paginated
pub async fn list_users(
    _caller: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    let page = accounts::list_users(state.users.as_ref(), state.sessions.as_ref(), &query).await?;

    Ok(Json(UserListResponse {
        success: true,
        message: "User list fetched successfully".to_string(),
        per_page: page.per_page,
        current_page: page.current_page,
        total_pages: page.total_pages,
        total_users: page.total_users,
        users: page.users,
    }))
}

fn validate_patch(patch: &UserPatch) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(first_name) = &patch.first_name {
        errors.check("firstName", validate_name(first_name, "First name"));
    }
    if let Some(last_name) = &patch.last_name {
        errors.check("lastName", validate_name(last_name, "Last name"));
    }
    if let Some(email) = &patch.email {
        errors.check("email", validate_email(email));
    }
    if matches!(patch.phone_number, Some(n) if n <= 0) {
        errors.add("phoneNumber", "Phone number must be numeric");
    }

    errors.finish()
}

/// Update a profile with the recognized fields of the body
pub async fn update_profile(
    _caller: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<UpdateProfileResponse>, ApiError> {
    validate_uuid(&id, "User id").map_err(|e| ApiError::validation_field("id", e))?;

    let body = body
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Request body must be a JSON object"))?;
    let patch = accounts::patch_from_body(body)?;
    validate_patch(&patch)?;

    let user = accounts::update_profile(state.users.as_ref(), &id, &patch).await?;

    Ok(Json(UpdateProfileResponse {
        message: "Profile updated successfully".to_string(),
        user: UserResponse::from(user),
    }))
}

/// Soft delete an account
pub async fn delete_profile(
    _caller: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteProfileResponse>, ApiError> {
    validate_uuid(&id, "User id").map_err(|e| ApiError::validation_field("id", e))?;

    let user = accounts::soft_delete(state.users.as_ref(), &id).await?;

    Ok(Json(DeleteProfileResponse {
        success: true,
        message: "User soft deleted successfully".to_string(),
        data: UserResponse::from(user),
    }))
}
