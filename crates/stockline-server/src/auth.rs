use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::{error, info, warn};

use crate::error::{ApiError, ServerResult};
use crate::session::{Session, SessionStore};
use crate::state::AppState;
use crate::users::{hash_password, verify_password, UserStore};

/// The authenticated caller of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
}

/// Login, session lookup, and logout over injected user and session stores.
pub struct Authenticator {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
}

impl Authenticator {
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { users, sessions }
    }

    /// Check credentials and open a session. `None` on any mismatch.
    pub async fn login(&self, username: &str, password: &str) -> ServerResult<Option<Session>> {
        let user = self.users.find(username).await?;
        let password = password.to_string();
        // Unknown users still pay for one Argon2 verification.
        let verified = tokio::task::spawn_blocking(move || match user {
            Some(user) => user.verify(&password),
            None => {
                verify_password(&password, dummy_secret());
                false
            }
        })
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "credential verification task failed");
            false
        });

        if !verified {
            warn!(username, "failed login attempt");
            return Ok(None);
        }

        let session = Session::issue(username);
        self.sessions.insert(session.clone()).await?;
        info!(username, "user logged in");
        Ok(Some(session))
    }

    /// Resolve a token to the identity that owns it.
    pub async fn authenticate(&self, token: &str) -> ServerResult<Option<Identity>> {
        Ok(self
            .sessions
            .get(token)
            .await?
            .map(|session| Identity {
                username: session.username,
            }))
    }

    pub async fn logout(&self, token: &str) -> ServerResult<bool> {
        self.sessions.remove(token).await
    }
}

/// Hash verified in place of a missing user's stored secret.
fn dummy_secret() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("stockline-unknown-user").unwrap_or_default())
}

/// Extract the session token from an `Authorization` header value.
///
/// Accepts either the bare token or `Bearer <token>`.
pub fn token_from_header(value: &str) -> Option<&str> {
    let value = value.trim();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}

/// Extractor for routes that require a logged-in caller.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub identity: Identity,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(token_from_header)
            .ok_or_else(ApiError::unauthorized)?
            .to_string();

        let identity = state
            .auth
            .authenticate(&token)
            .await?
            .ok_or_else(ApiError::unauthorized)?;

        Ok(Self { identity, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionStore;
    use crate::users::{InMemoryUserStore, UserRecord};

    fn authenticator() -> Authenticator {
        let users = InMemoryUserStore::new();
        users.insert(UserRecord::new("admin", "hunter2").unwrap()).unwrap();
        Authenticator::new(Arc::new(users), Arc::new(InMemorySessionStore::new()))
    }

    #[test]
    fn header_forms() {
        assert_eq!(token_from_header("abc123"), Some("abc123"));
        assert_eq!(token_from_header("Bearer abc123"), Some("abc123"));
        assert_eq!(token_from_header("bearer  abc123 "), Some("abc123"));
        assert_eq!(token_from_header("Bearer "), None);
        assert_eq!(token_from_header(""), None);
    }

    #[tokio::test]
    async fn login_then_authenticate_then_logout() {
        let auth = authenticator();
        let session = auth.login("admin", "hunter2").await.unwrap().unwrap();
        assert_eq!(session.username, "admin");

        let identity = auth.authenticate(&session.token).await.unwrap().unwrap();
        assert_eq!(identity.username, "admin");

        assert!(auth.logout(&session.token).await.unwrap());
        assert!(auth.authenticate(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bad_credentials_open_no_session() {
        let auth = authenticator();
        assert!(auth.login("admin", "wrong").await.unwrap().is_none());
        assert!(auth.login("ghost", "hunter2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_user_is_checked_against_a_real_hash() {
        assert!(argon2::password_hash::PasswordHash::new(dummy_secret()).is_ok());
        assert!(verify_password("stockline-unknown-user", dummy_secret()));

        let auth = authenticator();
        assert!(auth
            .login("ghost", "stockline-unknown-user")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn each_login_gets_a_distinct_token() {
        let auth = authenticator();
        let a = auth.login("admin", "hunter2").await.unwrap().unwrap();
        let b = auth.login("admin", "hunter2").await.unwrap().unwrap();
        assert_ne!(a.token, b.token);
    }
}
