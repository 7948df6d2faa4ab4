use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use crate::error::{ServerError, ServerResult};

/// Number of random bytes in a session token.
pub const TOKEN_BYTES: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `username` under a fresh random token.
    pub fn issue(username: impl Into<String>) -> Self {
        Self {
            token: generate_token(),
            username: username.into(),
            created_at: Utc::now(),
        }
    }
}

/// Hex-encoded token drawn from the OS-seeded thread RNG.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Table of live sessions, keyed by token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: Session) -> ServerResult<()>;
    async fn get(&self, token: &str) -> ServerResult<Option<Session>>;
    /// Returns `true` if a session was removed.
    async fn remove(&self, token: &str) -> ServerResult<bool>;
}

/// Process-lifetime session table with optional expiry.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Option<Duration>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Option<std::time::Duration>) -> Self {
        Self {
            sessions: RwLock::default(),
            ttl: ttl.and_then(|ttl| Duration::from_std(ttl).ok()),
        }
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        self.ttl
            .is_some_and(|ttl| now.signed_duration_since(session.created_at) >= ttl)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> ServerError {
    ServerError::Internal("session table lock poisoned".into())
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: Session) -> ServerResult<()> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        if self.ttl.is_some() {
            let now = Utc::now();
            sessions.retain(|_, s| !self.is_expired(s, now));
        }
        sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn get(&self, token: &str) -> ServerResult<Option<Session>> {
        let session = {
            let sessions = self.sessions.read().map_err(|_| poisoned())?;
            sessions.get(token).cloned()
        };
        match session {
            Some(s) if self.is_expired(&s, Utc::now()) => {
                self.remove(token).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn remove(&self, token: &str) -> ServerResult<bool> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        Ok(sessions.remove(token).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let store = InMemorySessionStore::new();
        let session = Session::issue("alice");
        let token = session.token.clone();

        store.insert(session.clone()).await.unwrap();
        assert_eq!(store.get(&token).await.unwrap(), Some(session));
        assert!(store.remove(&token).await.unwrap());
        assert!(!store.remove(&token).await.unwrap());
        assert_eq!(store.get(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_token_is_none() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_sessions_are_dropped() {
        let store = InMemorySessionStore::with_ttl(Some(std::time::Duration::from_secs(60)));
        let mut stale = Session::issue("bob");
        stale.created_at = Utc::now() - Duration::seconds(120);
        let token = stale.token.clone();

        store.insert(stale).await.unwrap();
        assert_eq!(store.get(&token).await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn sessions_without_ttl_never_expire() {
        let store = InMemorySessionStore::new();
        let mut old = Session::issue("carol");
        old.created_at = Utc::now() - Duration::days(365);
        let token = old.token.clone();

        store.insert(old).await.unwrap();
        assert!(store.get(&token).await.unwrap().is_some());
    }
}
