use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stockline_ledger::{FileLedgerConfig, ProjectionConfig, SyncMode};

use crate::error::{ServerError, ServerResult};

/// Top-level configuration, loaded from a TOML file.
///
/// Every section and field is optional; missing values take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub inventory: ProjectionConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ServerResult<()> {
        let prefix = &self.server.api_prefix;
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(ServerError::Config(format!(
                "api_prefix must start with '/': {prefix}"
            )));
        }
        if self.storage.compact_after == 0 {
            return Err(ServerError::Config("compact_after must be at least 1".into()));
        }
        if self.inventory.critical_threshold > self.inventory.low_threshold {
            return Err(ServerError::Config(
                "critical_threshold must not exceed low_threshold".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Path prefix all API routes are mounted under.
    pub api_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 5000)),
            api_prefix: "/api".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Ledger directory. The ledger is kept in memory only when unset.
    pub data_dir: Option<PathBuf>,
    pub sync_mode: SyncMode,
    pub compact_after: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let ledger = FileLedgerConfig::default();
        Self {
            data_dir: None,
            sync_mode: ledger.sync_mode,
            compact_after: ledger.compact_after,
        }
    }
}

impl StorageConfig {
    pub fn ledger_config(&self) -> FileLedgerConfig {
        FileLedgerConfig {
            sync_mode: self.sync_mode,
            compact_after: self.compact_after,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub users_file: PathBuf,
    /// Session lifetime. Sessions never expire when unset.
    pub session_ttl_secs: Option<u64>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            users_file: PathBuf::from("users.json"),
            session_ttl_secs: None,
        }
    }
}
