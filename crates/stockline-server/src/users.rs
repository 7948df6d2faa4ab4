use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ServerError, ServerResult};

/// A stored user. The secret is an Argon2id PHC string, never plaintext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    pub credential_secret: String,
}

impl UserRecord {
    pub fn new(username: &str, password: &str) -> ServerResult<Self> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ServerError::UserStore("username must not be empty".into()));
        }
        if password.is_empty() {
            return Err(ServerError::UserStore("password must not be empty".into()));
        }
        Ok(Self {
            username: username.to_string(),
            credential_secret: hash_password(password)?,
        })
    }

    pub fn verify(&self, password: &str) -> bool {
        verify_password(password, &self.credential_secret)
    }
}

/// Hash `password` with Argon2id under a fresh random salt.
pub fn hash_password(password: &str) -> ServerResult<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| ServerError::Credential(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServerError::Credential(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Read-only view of user credentials for the server.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, username: &str) -> ServerResult<Option<UserRecord>>;
}

/// Users kept in a JSON array on disk.
///
/// The file is read on every lookup, so users seeded while the server runs
/// can log in without a restart. Writes replace the file atomically.
pub struct FileUserStore {
    path: PathBuf,
}

impl FileUserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored users; a missing file means no users.
    pub fn load(&self) -> ServerResult<Vec<UserRecord>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => parse_users(&self.path, &raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Create or replace a user. Returns `true` if the user is new.
    pub fn upsert(&self, record: UserRecord) -> ServerResult<bool> {
        let mut users = self.load()?;
        let created = match users.iter_mut().find(|u| u.username == record.username) {
            Some(existing) => {
                *existing = record.clone();
                false
            }
            None => {
                users.push(record.clone());
                true
            }
        };
        self.write_atomic(&users)?;
        info!(username = %record.username, created, "user record saved");
        Ok(created)
    }

    fn write_atomic(&self, users: &[UserRecord]) -> ServerResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, users)
                .map_err(|e| ServerError::UserStore(e.to_string()))?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| ServerError::Io(e.error))?;
        Ok(())
    }
}

fn parse_users(path: &Path, raw: &str) -> ServerResult<Vec<UserRecord>> {
    serde_json::from_str(raw)
        .map_err(|e| ServerError::UserStore(format!("{}: {e}", path.display())))
}

#[async_trait]
impl UserStore for FileUserStore {
    async fn find(&self, username: &str) -> ServerResult<Option<UserRecord>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(parse_users(&self.path, &raw)?
            .into_iter()
            .find(|u| u.username == username))
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: UserRecord) -> ServerResult<()> {
        let mut users = self
            .users
            .write()
            .map_err(|_| ServerError::Internal("user table lock poisoned".into()))?;
        users.insert(record.username.clone(), record);
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find(&self, username: &str) -> ServerResult<Option<UserRecord>> {
        let users = self
            .users
            .read()
            .map_err(|_| ServerError::Internal("user table lock poisoned".into()))?;
        Ok(users.get(username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_and_verifiable() {
        let a = hash_password("s3cret").unwrap();
        let b = hash_password("s3cret").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(verify_password("s3cret", &a));
        assert!(!verify_password("wrong", &a));
        assert!(!verify_password("s3cret", "plaintext"));
    }

    #[test]
    fn record_rejects_blank_fields() {
        assert!(UserRecord::new("  ", "pw").is_err());
        assert!(UserRecord::new("alice", "").is_err());
        assert_eq!(UserRecord::new(" alice ", "pw").unwrap().username, "alice");
    }

    #[tokio::test]
    async fn file_store_upsert_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileUserStore::new(dir.path().join("users.json"));
        assert!(store.find("alice").await.unwrap().is_none());

        assert!(store.upsert(UserRecord::new("alice", "one").unwrap()).unwrap());
        assert!(store.upsert(UserRecord::new("bob", "two").unwrap()).unwrap());
        assert!(!store.upsert(UserRecord::new("alice", "three").unwrap()).unwrap());

        let alice = store.find("alice").await.unwrap().unwrap();
        assert!(alice.verify("three"));
        assert!(!alice.verify("one"));
        assert_eq!(store.load().unwrap().len(), 2);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("credentialSecret"));
        assert!(!raw.contains("three"));
    }

    #[tokio::test]
    async fn corrupt_users_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "[{").unwrap();
        let store = FileUserStore::new(path);
        assert!(matches!(
            store.find("alice").await,
            Err(ServerError::UserStore(_))
        ));
    }

    #[tokio::test]
    async fn in_memory_store() {
        let store = InMemoryUserStore::new();
        store.insert(UserRecord::new("admin", "pw").unwrap()).unwrap();
        assert!(store.find("admin").await.unwrap().unwrap().verify("pw"));
        assert!(store.find("other").await.unwrap().is_none());
    }
}
