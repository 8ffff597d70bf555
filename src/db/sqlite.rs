//! SQLite implementations of the storage traits.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};

use super::store::{SessionStore, SoftDelete, StoreError, UniqueField, UserStore};
use super::{now, timestamp, DbPool, LoginToken, NewUser, Pagination, User, UserFilter, UserPatch};

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Turn a UNIQUE violation on `users` into a typed conflict.
fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let msg = db_err.message();
        if msg.contains("UNIQUE constraint failed") {
            if msg.contains("users.email") {
                return StoreError::Conflict(UniqueField::Email);
            }
            if msg.contains("users.phone_number") {
                return StoreError::Conflict(UniqueField::PhoneNumber);
            }
        }
    }
    StoreError::Database(err)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Build the WHERE clause shared by the count and list queries
fn filter_clause(filter: &UserFilter) -> (String, Vec<String>) {
    let mut conditions = vec!["is_deleted = 0".to_string()];
    let mut bindings: Vec<String> = Vec::new();

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        conditions.push(
            r"(first_name LIKE ? ESCAPE '\' OR last_name LIKE ? ESCAPE '\' OR email LIKE ? ESCAPE '\')"
                .to_string(),
        );
        bindings.extend([pattern.clone(), pattern.clone(), pattern]);
    }

    if let Some(role) = filter.role.as_deref().filter(|r| !r.is_empty()) {
        conditions.push("role = ? COLLATE NOCASE".to_string());
        bindings.push(role.to_string());
    }

    (format!("WHERE {}", conditions.join(" AND ")), bindings)
}

#[derive(Clone)]
pub struct SqliteUserStore {
    pool: DbPool,
}

impl SqliteUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_phone(&self, phone_number: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone_number = ?")
            .bind(phone_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now();

        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, phone_number, role, password_hash, is_active, is_deleted, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 1, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.phone_number)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        self.find_by_id(&id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn update_by_id(&self, id: &str, patch: &UserPatch) -> Result<Option<User>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                email = COALESCE(?, email),
                phone_number = COALESCE(?, phone_number),
                is_active = COALESCE(?, is_active),
                role = COALESCE(?, role),
                updated_at = ?
            WHERE id = ? AND is_deleted = 0
            "#,
        )
        .bind(patch.first_name.as_deref())
        .bind(patch.last_name.as_deref())
        .bind(patch.email.as_deref())
        .bind(patch.phone_number)
        .bind(patch.is_active)
        .bind(patch.role.map(|r| r.as_str()))
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn mark_deleted(&self, id: &str) -> Result<SoftDelete, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        let current = self.find_by_id(id).await?;
        Ok(match (result.rows_affected(), current) {
            (0, Some(_)) => SoftDelete::AlreadyDeleted,
            (_, Some(user)) => SoftDelete::Deleted(user),
            (_, None) => SoftDelete::NotFound,
        })
    }

    async fn count_matching(&self, filter: &UserFilter) -> Result<i64, StoreError> {
        let (where_clause, bindings) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM users {}", where_clause);

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for binding in &bindings {
            query = query.bind(binding);
        }
        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn list_matching(
        &self,
        filter: &UserFilter,
        page: Pagination,
    ) -> Result<Vec<User>, StoreError> {
        let (where_clause, bindings) = filter_clause(filter);
        let sql = format!(
            "SELECT * FROM users {} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
            where_clause
        );

        let mut query = sqlx::query_as::<_, User>(&sql);
        for binding in &bindings {
            query = query.bind(binding);
        }
        let users = query
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }
}

#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: DbPool,
    retention: Duration,
}

impl SqliteSessionStore {
    pub fn new(pool: DbPool, retention: Duration) -> Self {
        Self { pool, retention }
    }

    /// Rows created at or before this instant are expired
    fn cutoff(&self) -> String {
        timestamp(Utc::now() - self.retention)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, user_id: &str, token: &str) -> Result<LoginToken, StoreError> {
        let session = LoginToken {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            token_hash: hash_token(token),
            created_at: now(),
        };

        sqlx::query(
            "INSERT INTO login_tokens (id, user_id, token_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.token_hash)
        .bind(&session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(session)
    }

    async fn exists_by_token(&self, token: &str) -> Result<bool, StoreError> {
        let found: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM login_tokens WHERE token_hash = ? AND created_at > ?",
        )
        .bind(hash_token(token))
        .bind(self.cutoff())
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM login_tokens WHERE token_hash = ? AND created_at > ?")
            .bind(hash_token(token))
            .bind(self.cutoff())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_owner_ids(&self) -> Result<Vec<String>, StoreError> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT user_id FROM login_tokens WHERE created_at > ?",
        )
        .bind(self.cutoff())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM login_tokens WHERE created_at <= ?")
            .bind(self.cutoff())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, Role};

    fn new_user(first: &str, last: &str, email: &str, phone: i64) -> NewUser {
        NewUser {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
            phone_number: phone,
            role: Role::Admin,
            password_hash: "hash".to_string(),
        }
    }

    async fn backdate_sessions(pool: &DbPool, hours: i64) {
        sqlx::query("UPDATE login_tokens SET created_at = ?")
            .bind(timestamp(Utc::now() - Duration::hours(hours)))
            .execute(pool)
            .await
            .unwrap();
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let a = hash_token("abc");
        assert_eq!(a, hash_token("abc"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_token("abd"));
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("50%_off"), r"50\%\_off");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = SqliteUserStore::new(test_pool().await);
        let created = store
            .create(new_user("Jane", "Doe", "jane@example.com", 5550101))
            .await
            .unwrap();

        assert!(created.is_active);
        assert!(!created.is_deleted);
        assert_eq!(created.role, "Admin");

        let by_email = store.find_by_email("jane@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        let by_phone = store.find_by_phone(5550101).await.unwrap().unwrap();
        assert_eq!(by_phone.id, created.id);
        assert!(store.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_reports_conflicting_field() {
        let store = SqliteUserStore::new(test_pool().await);
        store
            .create(new_user("Jane", "Doe", "jane@example.com", 5550101))
            .await
            .unwrap();

        let err = store
            .create(new_user("Other", "Person", "jane@example.com", 5550102))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(UniqueField::Email)));

        let err = store
            .create(new_user("Other", "Person", "other@example.com", 5550101))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(UniqueField::PhoneNumber)));
    }

    #[tokio::test]
    async fn test_mark_deleted_only_flips_once() {
        let store = SqliteUserStore::new(test_pool().await);
        let user = store
            .create(new_user("Jane", "Doe", "jane@example.com", 5550101))
            .await
            .unwrap();

        let deleted = match store.mark_deleted(&user.id).await.unwrap() {
            SoftDelete::Deleted(u) => u,
            other => panic!("Expected Deleted, got {:?}", other),
        };
        assert!(deleted.is_deleted);

        assert!(matches!(
            store.mark_deleted(&user.id).await.unwrap(),
            SoftDelete::AlreadyDeleted
        ));
        let after = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(after.updated_at, deleted.updated_at);

        assert!(matches!(
            store.mark_deleted("missing").await.unwrap(),
            SoftDelete::NotFound
        ));
    }

    #[tokio::test]
    async fn test_update_skips_deleted_accounts() {
        let store = SqliteUserStore::new(test_pool().await);
        let user = store
            .create(new_user("Jane", "Doe", "jane@example.com", 5550101))
            .await
            .unwrap();

        let patch = UserPatch {
            first_name: Some("Janet".to_string()),
            is_active: Some(false),
            ..Default::default()
        };
        let updated = store.update_by_id(&user.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.first_name, "Janet");
        assert_eq!(updated.last_name, "Doe");
        assert!(!updated.is_active);

        store.mark_deleted(&user.id).await.unwrap();
        assert!(store.update_by_id(&user.id, &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_maps_unique_conflicts() {
        let store = SqliteUserStore::new(test_pool().await);
        store
            .create(new_user("Jane", "Doe", "jane@example.com", 5550101))
            .await
            .unwrap();
        let other = store
            .create(new_user("John", "Roe", "john@example.com", 5550102))
            .await
            .unwrap();

        let patch = UserPatch {
            email: Some("jane@example.com".to_string()),
            ..Default::default()
        };
        let err = store.update_by_id(&other.id, &patch).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(UniqueField::Email)));
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let store = SqliteUserStore::new(test_pool().await);
        store
            .create(new_user("Jane", "Doe", "jane@example.com", 5550101))
            .await
            .unwrap();
        store
            .create(new_user("Mary", "Janssen", "mary@example.com", 5550102))
            .await
            .unwrap();
        let gone = store
            .create(new_user("Janice", "Gone", "janice@example.com", 5550103))
            .await
            .unwrap();
        let mut admin = new_user("Bob", "Smith", "bob@example.com", 5550104);
        admin.role = Role::SuperAdmin;
        store.create(admin).await.unwrap();
        store.mark_deleted(&gone.id).await.unwrap();

        let search = UserFilter {
            search: Some("JAN".to_string()),
            role: None,
        };
        assert_eq!(store.count_matching(&search).await.unwrap(), 2);

        let by_role = UserFilter {
            search: None,
            role: Some("superadmin".to_string()),
        };
        let supers = store
            .list_matching(&by_role, Pagination { page: 1, per_page: 10 })
            .await
            .unwrap();
        assert_eq!(supers.len(), 1);
        assert_eq!(supers[0].email, "bob@example.com");

        let all = UserFilter::default();
        assert_eq!(store.count_matching(&all).await.unwrap(), 3);
        let first = store
            .list_matching(&all, Pagination { page: 1, per_page: 2 })
            .await
            .unwrap();
        let second = store
            .list_matching(&all, Pagination { page: 2, per_page: 2 })
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].email, "bob@example.com");
        assert_eq!(second[0].email, "jane@example.com");
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let store = SqliteUserStore::new(test_pool().await);
        store
            .create(new_user("Jane", "Doe", "jane@example.com", 5550101))
            .await
            .unwrap();

        let filter = UserFilter {
            search: Some("%".to_string()),
            role: None,
        };
        assert_eq!(store.count_matching(&filter).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_session_create_exists_delete() {
        let pool = test_pool().await;
        let sessions = SqliteSessionStore::new(pool.clone(), Duration::hours(48));

        let row = sessions.create("user-1", "token-a").await.unwrap();
        assert_ne!(row.token_hash, "token-a");
        assert!(sessions.exists_by_token("token-a").await.unwrap());
        assert!(!sessions.exists_by_token("token-b").await.unwrap());

        assert!(sessions.delete_by_token("token-a").await.unwrap());
        assert!(!sessions.delete_by_token("token-a").await.unwrap());
        assert!(!sessions.exists_by_token("token-a").await.unwrap());
    }

    #[tokio::test]
    async fn test_session_owner_needs_no_user_row() {
        let pool = test_pool().await;
        let fk_enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(fk_enabled, 1);

        let sessions = SqliteSessionStore::new(pool.clone(), Duration::hours(48));
        sessions.create("no-such-user", "token-a").await.unwrap();
        assert!(sessions.exists_by_token("token-a").await.unwrap());
        assert_eq!(sessions.list_owner_ids().await.unwrap(), vec!["no-such-user".to_string()]);
    }

    #[tokio::test]
    async fn test_sessions_past_retention_are_gone() {
        let pool = test_pool().await;
        let sessions = SqliteSessionStore::new(pool.clone(), Duration::hours(48));
        sessions.create("user-1", "token-a").await.unwrap();

        backdate_sessions(&pool, 49).await;

        assert!(!sessions.exists_by_token("token-a").await.unwrap());
        assert!(!sessions.delete_by_token("token-a").await.unwrap());
        assert!(sessions.list_owner_ids().await.unwrap().is_empty());

        assert_eq!(sessions.purge_expired().await.unwrap(), 1);
        assert_eq!(sessions.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_owner_ids_is_distinct() {
        let pool = test_pool().await;
        let sessions = SqliteSessionStore::new(pool, Duration::hours(48));
        sessions.create("user-1", "token-a").await.unwrap();
        sessions.create("user-1", "token-b").await.unwrap();
        sessions.create("user-2", "token-c").await.unwrap();

        let mut owners = sessions.list_owner_ids().await.unwrap();
        owners.sort();
        assert_eq!(owners, vec!["user-1".to_string(), "user-2".to_string()]);
        assert_eq!(sessions.purge_expired().await.unwrap(), 0);
    }
}
