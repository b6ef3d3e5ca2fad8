//! HTTP routes for the query server

pub mod query;

use axum::{
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Query and health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(query::handle_query))
        .route("/health", get(health_check))
}

/// Liveness probe
async fn health_check() -> &'static str {
    "OK"
}
