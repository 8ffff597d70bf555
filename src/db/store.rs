//! Storage traits consumed by the auth core.
//!
//! Handlers and the auth functions only see these traits, so the SQLite
//! implementations can be swapped for any other backend.

use async_trait::async_trait;
use thiserror::Error;

use super::{LoginToken, NewUser, Pagination, User, UserFilter, UserPatch};

/// Columns that carry a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    PhoneNumber,
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueField::Email => write!(f, "email"),
            UniqueField::PhoneNumber => write!(f, "phone number"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} is already taken")]
    Conflict(UniqueField),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of a conditional soft delete
#[derive(Debug, Clone)]
pub enum SoftDelete {
    /// The flag was flipped; carries the updated record
    Deleted(User),
    AlreadyDeleted,
    NotFound,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_phone(&self, phone_number: i64) -> Result<Option<User>, StoreError>;

    /// Insert a new account. Fails with `Conflict` when the email or phone
    /// number is already held by any record, deleted or not.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Apply a patch to a non-deleted account. Returns `None` when no
    /// such account exists.
    async fn update_by_id(&self, id: &str, patch: &UserPatch) -> Result<Option<User>, StoreError>;

    /// Flip `is_deleted` only if it is currently unset.
    async fn mark_deleted(&self, id: &str) -> Result<SoftDelete, StoreError>;

    async fn count_matching(&self, filter: &UserFilter) -> Result<i64, StoreError>;

    /// One page of matching accounts, newest first.
    async fn list_matching(
        &self,
        filter: &UserFilter,
        page: Pagination,
    ) -> Result<Vec<User>, StoreError>;
}

/// Session token storage. Rows older than the retention window behave as
/// if they had been deleted.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, user_id: &str, token: &str) -> Result<LoginToken, StoreError>;

    async fn exists_by_token(&self, token: &str) -> Result<bool, StoreError>;

    /// Returns whether a live row was removed.
    async fn delete_by_token(&self, token: &str) -> Result<bool, StoreError>;

    /// Owner ids of every live session (one entry per owner).
    async fn list_owner_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Physically remove rows past the retention window.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}
