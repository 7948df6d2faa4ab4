use tokio::net::TcpListener;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Stockline HTTP server.
pub struct StocklineServer {
    config: AppConfig,
}

impl StocklineServer {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Open storage and build the router (useful for testing).
    pub fn router(&self) -> ServerResult<axum::Router> {
        let state = AppState::from_config(&self.config)?;
        Ok(build_router(state, &self.config.server.api_prefix))
    }

    /// Serve requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router()?;
        let listener = TcpListener::bind(self.config.server.bind_addr).await?;
        info!(
            addr = %self.config.server.bind_addr,
            prefix = %self.config.server.api_prefix,
            "Stockline server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        info!("Stockline server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_construction() {
        let server = StocklineServer::new(AppConfig::default());
        assert_eq!(server.config().server.bind_addr, "127.0.0.1:5000".parse().unwrap());
    }

    #[test]
    fn router_builds_with_durable_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.data_dir = Some(dir.path().join("ledger"));
        config.auth.users_file = dir.path().join("users.json");

        let server = StocklineServer::new(config);
        assert!(server.router().is_ok());
        assert!(dir.path().join("ledger").join(stockline_ledger::SNAPSHOT_FILE).exists());
    }
}
