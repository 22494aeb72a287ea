//! In-memory session cache.
//!
//! Bidirectional mapping between local user identifiers and ephemeral
//! session identifiers. Entries are minted at successful credential
//! verification and destroyed on logout; nothing is persisted across a
//! process restart.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Length of minted session identifiers.
pub const SESSION_ID_LENGTH: usize = 24;

fn random_session_id() -> String {
    // thread_rng is a CSPRNG; identifiers must be unguessable
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(Debug, Default)]
struct Maps {
    user_to_session: HashMap<String, String>,
    session_to_user: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct SessionCache {
    inner: RwLock<Maps>,
}

impl SessionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh session identifier for a user. An existing mapping for
    /// the same user is replaced, including its reverse entry, so each user
    /// holds at most one live session.
    pub async fn create(&self, user: &str) -> String {
        let session_id = random_session_id();
        let mut maps = self.inner.write().await;
        if let Some(stale) = maps
            .user_to_session
            .insert(user.to_string(), session_id.clone())
        {
            maps.session_to_user.remove(&stale);
        }
        maps.session_to_user
            .insert(session_id.clone(), user.to_string());
        tracing::debug!(user = %user, "session created");
        session_id
    }

    pub async fn lookup(&self, session_id: &str) -> Option<String> {
        self.inner.read().await.session_to_user.get(session_id).cloned()
    }

    pub async fn lookup_by_user(&self, user: &str) -> Option<String> {
        self.inner.read().await.user_to_session.get(user).cloned()
    }

    /// Remove both directions of a user's mapping. Idempotent.
    pub async fn destroy(&self, user: &str) {
        let mut maps = self.inner.write().await;
        if let Some(session_id) = maps.user_to_session.remove(user) {
            maps.session_to_user.remove(&session_id);
            tracing::debug!(user = %user, "session destroyed");
        }
    }
}
