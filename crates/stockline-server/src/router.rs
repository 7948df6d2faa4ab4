use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Routes relative to the API prefix.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handler::health_handler))
        .route("/ledger", get(handler::get_chain).post(handler::append_block))
        .route("/ledger/pending", get(handler::get_pending))
        .route("/ledger/verify", get(handler::verify_chain))
        .route("/ledger/clear", post(handler::clear_chain))
        .route("/ledger/:index/status", post(handler::update_status))
        .route("/inventory/summary", get(handler::inventory_summary))
        .route("/auth/login", post(handler::login))
        .route("/auth/me", get(handler::me))
        .route("/auth/logout", post(handler::logout))
}

/// Build the axum router with every Stockline endpoint mounted under `prefix`.
pub fn build_router(state: AppState, prefix: &str) -> Router {
    let prefix = prefix.trim_end_matches('/');
    let routes = if prefix.is_empty() {
        Router::new().merge(api_routes())
    } else {
        Router::new().nest(prefix, api_routes())
    };

    routes
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
