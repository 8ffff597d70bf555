//! Account lifecycle: registration, profile updates, soft delete, listing.
//!
//! Uniqueness and the deleted flag are enforced by the store with unique
//! indexes and conditional updates; the reads done here only pick the error
//! to report.

use serde_json::{Map, Value};

use super::password::hash_password;
use super::{AuthError, PresenceSnapshot};
use crate::config::BootstrapAdmin;
use crate::db::{
    NewUser, Pagination, Role, SessionStore, SoftDelete, User, UserFilter, UserListItem,
    UserListQuery, UserPatch, UserStore,
};

const DEFAULT_PAGE_SIZE: i64 = 3;
const MAX_PAGE_SIZE: i64 = 100;

/// Validated registration input
#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: i64,
    pub password: String,
    pub role: Role,
}

/// One page of the account listing
#[derive(Debug, Clone)]
pub struct UserPage {
    pub per_page: i64,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_users: i64,
    pub users: Vec<UserListItem>,
}

pub async fn register(users: &dyn UserStore, registration: Registration) -> Result<User, AuthError> {
    // Checked in this order so a request clashing on both reports the email
    if users.find_by_email(&registration.email).await?.is_some() {
        return Err(AuthError::EmailConflict);
    }
    if users.find_by_phone(registration.phone_number).await?.is_some() {
        return Err(AuthError::PhoneConflict);
    }

    let password_hash = hash_password(&registration.password).map_err(AuthError::internal)?;

    let user = users
        .create(NewUser {
            first_name: registration.first_name,
            last_name: registration.last_name,
            email: registration.email,
            phone_number: registration.phone_number,
            role: registration.role,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "Registered user");
    Ok(user)
}

/// Create the configured bootstrap SuperAdmin unless its email is taken.
/// Returns whether an account was created.
pub async fn ensure_bootstrap_admin(
    users: &dyn UserStore,
    admin: &BootstrapAdmin,
) -> Result<bool, AuthError> {
    if users.find_by_email(&admin.email).await?.is_some() {
        tracing::debug!(email = %admin.email, "Bootstrap admin already exists");
        return Ok(false);
    }

    register(
        users,
        Registration {
            first_name: admin.first_name.clone(),
            last_name: admin.last_name.clone(),
            email: admin.email.clone(),
            phone_number: admin.phone_number,
            password: admin.password.clone(),
            role: Role::SuperAdmin,
        },
    )
    .await?;

    tracing::info!(email = %admin.email, "Created bootstrap admin");
    Ok(true)
}

/// Extract the recognized, correctly typed fields of an update body.
///
/// Unknown keys, nulls and wrongly typed values are dropped. A role string
/// that is not a known role, or a phone number that is not an integer, is a
/// validation failure.
pub fn patch_from_body(body: &Map<String, Value>) -> Result<UserPatch, AuthError> {
    let string_field = |key: &str| match body.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };

    let phone_number = match body.get("phoneNumber") {
        Some(Value::Number(n)) => Some(
            n.as_i64()
                .ok_or_else(|| AuthError::validation("phoneNumber", "Phone number must be numeric"))?,
        ),
        Some(Value::String(s)) => Some(
            s.trim()
                .parse::<i64>()
                .map_err(|_| AuthError::validation("phoneNumber", "Phone number must be numeric"))?,
        ),
        _ => None,
    };

    let is_active = match body.get("isActive") {
        Some(Value::Bool(b)) => Some(*b),
        _ => None,
    };

    let role = match body.get("role") {
        Some(Value::String(s)) => Some(
            s.parse::<Role>()
                .map_err(|_| AuthError::validation("role", "Role must be either Admin or SuperAdmin"))?,
        ),
        _ => None,
    };

    Ok(UserPatch {
        first_name: string_field("firstName"),
        last_name: string_field("lastName"),
        email: string_field("email"),
        phone_number,
        is_active,
        role,
    })
}

pub async fn update_profile(
    users: &dyn UserStore,
    id: &str,
    patch: &UserPatch,
) -> Result<User, AuthError> {
    match users.find_by_id(id).await? {
        None => return Err(AuthError::NotFound),
        Some(user) if user.is_deleted => return Err(AuthError::AccountDeleted),
        Some(_) => {}
    }

    // A concurrent soft delete makes the conditional update match nothing
    let user = users
        .update_by_id(id, patch)
        .await?
        .ok_or(AuthError::AccountDeleted)?;

    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(user)
}

pub async fn soft_delete(users: &dyn UserStore, id: &str) -> Result<User, AuthError> {
    match users.mark_deleted(id).await? {
        SoftDelete::Deleted(user) => {
            tracing::info!(user_id = %user.id, "User soft deleted");
            Ok(user)
        }
        SoftDelete::AlreadyDeleted => Err(AuthError::AlreadyDeleted),
        SoftDelete::NotFound => Err(AuthError::NotFound),
    }
}

/// Parse a positive integer query value, falling back on anything else.
fn parse_positive(raw: Option<&str>, fallback: i64) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n != 0)
        .unwrap_or(fallback)
}

/// Page numbers are capped so the row offset always fits in an i64.
pub fn pagination_from_query(query: &UserListQuery) -> Pagination {
    let per_page = parse_positive(query.limit.as_deref(), DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = parse_positive(query.page.as_deref(), 1).clamp(1, i64::MAX / per_page);
    Pagination { page, per_page }
}

pub fn filter_from_query(query: &UserListQuery) -> UserFilter {
    UserFilter {
        search: query.search.clone().filter(|s| !s.is_empty()),
        role: query
            .role
            .clone()
            .filter(|r| !r.is_empty() && !r.eq_ignore_ascii_case("all")),
    }
}

/// List non-deleted accounts, newest first, tagged with presence.
pub async fn list_users(
    users: &dyn UserStore,
    sessions: &dyn SessionStore,
    query: &UserListQuery,
) -> Result<UserPage, AuthError> {
    let page = pagination_from_query(query);
    let filter = filter_from_query(query);

    let total_users = users.count_matching(&filter).await?;
    let rows = users.list_matching(&filter, page).await?;
    let presence = PresenceSnapshot::load(sessions).await?;

    let users = rows
        .into_iter()
        .map(|user| {
            let status = presence.status_of(&user.id);
            UserListItem::new(user, status)
        })
        .collect();

    Ok(UserPage {
        per_page: page.per_page,
        current_page: page.page,
        total_pages: (total_users + page.per_page - 1) / page.per_page,
        total_users,
        users,
    })
}
