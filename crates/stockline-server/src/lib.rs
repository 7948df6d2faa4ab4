//! HTTP server for Stockline.
//!
//! Serves the inventory ledger over a JSON API: chain reads, authenticated
//! appends and status transitions, chain verification, and the derived
//! inventory summary. Sessions are issued at login against Argon2-hashed
//! user records.

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handler;
pub mod router;
pub mod server;
pub mod session;
pub mod state;
pub mod users;

pub use auth::{AuthUser, Authenticator, Identity};
pub use config::{AppConfig, AuthConfig, ServerConfig, StorageConfig};
pub use error::{ApiError, ServerError, ServerResult};
pub use router::build_router;
pub use server::StocklineServer;
pub use session::{InMemorySessionStore, Session, SessionStore};
pub use state::AppState;
pub use users::{FileUserStore, InMemoryUserStore, UserRecord, UserStore};
