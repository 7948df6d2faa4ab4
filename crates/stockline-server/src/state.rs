use std::sync::Arc;
use std::time::Duration;

use stockline_ledger::{FileLedger, InMemoryLedger, LedgerStore, ProjectionConfig};
use tracing::info;

use crate::auth::Authenticator;
use crate::config::AppConfig;
use crate::error::ServerResult;
use crate::session::InMemorySessionStore;
use crate::users::{FileUserStore, UserStore};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerStore>,
    pub auth: Arc<Authenticator>,
    pub projection: Arc<ProjectionConfig>,
    pub version: &'static str,
}

impl AppState {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        auth: Arc<Authenticator>,
        projection: ProjectionConfig,
    ) -> Self {
        Self {
            ledger,
            auth,
            projection: Arc::new(projection),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Open the configured ledger and user file and start an empty session table.
    pub fn from_config(config: &AppConfig) -> ServerResult<Self> {
        let ledger: Arc<dyn LedgerStore> = match &config.storage.data_dir {
            Some(dir) => Arc::new(FileLedger::open(dir, config.storage.ledger_config())?),
            None => {
                info!("no data_dir configured; ledger is kept in memory");
                Arc::new(InMemoryLedger::new()?)
            }
        };

        let users: Arc<dyn UserStore> = Arc::new(FileUserStore::new(&config.auth.users_file));
        let sessions = Arc::new(InMemorySessionStore::with_ttl(
            config.auth.session_ttl_secs.map(Duration::from_secs),
        ));

        Ok(Self::new(
            ledger,
            Arc::new(Authenticator::new(users, sessions)),
            config.inventory.clone(),
        ))
    }
}
