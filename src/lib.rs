pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod engine;

use config::Config;
use std::sync::Arc;

use crate::auth::{session_lifetime, TokenSigner};
use crate::db::{DbPool, SessionStore, SqliteSessionStore, SqliteUserStore, UserStore};

pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub signer: Arc<TokenSigner>,
}

impl AppState {
    /// Build the state with SQLite-backed stores sharing one pool
    pub fn new(config: Config, db: DbPool) -> Self {
        let users: Arc<dyn UserStore> = Arc::new(SqliteUserStore::new(db.clone()));
        let sessions: Arc<dyn SessionStore> =
            Arc::new(SqliteSessionStore::new(db, session_lifetime()));
        let signer = Arc::new(TokenSigner::new(&config.signing_secret(), session_lifetime()));

        Self {
            config,
            users,
            sessions,
            signer,
        }
    }

    /// Replace the store implementations, e.g. with test doubles
    pub fn with_stores(
        mut self,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        self.users = users;
        self.sessions = sessions;
        self
    }
}
