//! Authentication and session lifecycle.
//!
//! Login, per-request session checks, logout, account lifecycle rules and
//! presence all live here. Storage is reached only through the
//! [`UserStore`](crate::db::UserStore) and
//! [`SessionStore`](crate::db::SessionStore) traits.

pub mod accounts;
pub mod error;
pub mod password;
pub mod presence;
pub mod session;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use error::AuthError;
pub use presence::PresenceSnapshot;
pub use session::{AuthenticatedUser, IssuedSession};
pub use token::{Claims, TokenSigner};

/// Lifetime of a session in seconds (48 hours).
///
/// Both the token's `exp` claim and the session store's retention window are
/// derived from this value.
pub const SESSION_LIFETIME_SECS: i64 = 172_800;

pub fn session_lifetime() -> chrono::Duration {
    chrono::Duration::seconds(SESSION_LIFETIME_SECS)
}
