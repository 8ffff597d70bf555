//! Online/offline presence derived from live sessions.

use std::collections::HashSet;

use super::AuthError;
use crate::db::{Presence, SessionStore};

/// Owner ids of every live session, loaded once per request.
#[derive(Debug, Clone, Default)]
pub struct PresenceSnapshot {
    online: HashSet<String>,
}

impl PresenceSnapshot {
    pub async fn load(sessions: &dyn SessionStore) -> Result<Self, AuthError> {
        let online = sessions.list_owner_ids().await?.into_iter().collect();
        Ok(Self { online })
    }

    pub fn status_of(&self, user_id: &str) -> Presence {
        if self.online.contains(user_id) {
            Presence::Online
        } else {
            Presence::Offline
        }
    }
}

impl FromIterator<String> for PresenceSnapshot {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            online: iter.into_iter().collect(),
        }
    }
}
