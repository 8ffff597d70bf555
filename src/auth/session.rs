//! Session issuing (login), per-request authentication, and logout.

use serde::{Deserialize, Serialize};

use super::password::verify_password;
use super::{AuthError, TokenSigner};
use crate::db::{SessionStore, UserStore};

/// A freshly issued session
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub user_id: String,
}

/// Identity attached to a request that passed the session gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Verify credentials and issue a new session.
///
/// Unknown email, deleted account and wrong password all fail with
/// `InvalidCredentials`. An inactive account is only reported once the
/// password has matched.
pub async fn login(
    users: &dyn UserStore,
    sessions: &dyn SessionStore,
    signer: &TokenSigner,
    email: &str,
    password: &str,
) -> Result<IssuedSession, AuthError> {
    let user = match users.find_by_email(email).await? {
        Some(user) if !user.is_deleted => user,
        _ => return Err(AuthError::InvalidCredentials),
    };

    if !verify_password(password, &user.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(AuthError::AccountInactive);
    }

    let token = signer.sign(&user.id).map_err(AuthError::internal)?;
    sessions.create(&user.id, &token).await?;

    tracing::info!(user_id = %user.id, "Session issued");

    Ok(IssuedSession {
        token,
        user_id: user.id,
    })
}

/// Admit a request only if its token is signed, unexpired, and still stored.
pub async fn authenticate(
    signer: &TokenSigner,
    sessions: &dyn SessionStore,
    token: Option<&str>,
) -> Result<AuthenticatedUser, AuthError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Unauthenticated)?;

    let claims = signer.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        AuthError::InvalidToken
    })?;

    if !sessions.exists_by_token(token).await? {
        return Err(AuthError::SessionRevoked);
    }

    Ok(AuthenticatedUser {
        user_id: claims.user_id,
    })
}

/// Remove the stored session for `token`. The signature itself stays valid.
pub async fn logout(sessions: &dyn SessionStore, token: Option<&str>) -> Result<(), AuthError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    if !sessions.delete_by_token(token).await? {
        return Err(AuthError::AlreadyLoggedOut);
    }

    tracing::info!("Session terminated");
    Ok(())
}
