//! Shared fixtures for auth tests.

use super::password::hash_password;
use super::{session_lifetime, TokenSigner};
use crate::db::{
    test_pool, DbPool, NewUser, Role, SqliteSessionStore, SqliteUserStore, User, UserPatch,
    UserStore,
};

pub const TEST_SECRET: &str = "test-secret";

pub struct Harness {
    pub pool: DbPool,
    pub users: SqliteUserStore,
    pub sessions: SqliteSessionStore,
    pub signer: TokenSigner,
}

impl Harness {
    pub async fn new() -> Self {
        let pool = test_pool().await;
        Self {
            users: SqliteUserStore::new(pool.clone()),
            sessions: SqliteSessionStore::new(pool.clone(), session_lifetime()),
            signer: TokenSigner::new(TEST_SECRET, session_lifetime()),
            pool,
        }
    }

    /// Insert an active Admin account with the given password
    pub async fn user(&self, first: &str, email: &str, phone: i64, password: &str) -> User {
        self.users
            .create(NewUser {
                first_name: first.to_string(),
                last_name: "Tester".to_string(),
                email: email.to_string(),
                phone_number: phone,
                role: Role::Admin,
                password_hash: hash_password(password).unwrap(),
            })
            .await
            .unwrap()
    }

    pub async fn deactivate(&self, id: &str) {
        let patch = UserPatch {
            is_active: Some(false),
            ..Default::default()
        };
        self.users.update_by_id(id, &patch).await.unwrap().unwrap();
    }

    pub async fn session_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM login_tokens")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}
