//! HTTP server for the RAG system

pub mod routes;
pub mod state;

use axum::Router;
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{RagConfig, ServerConfig};
use crate::error::{Error, Result};
use state::AppState;

/// RAG HTTP Server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a server whose pipeline loads on the first request
    pub fn new(config: RagConfig) -> Self {
        let state = AppState::new(config.clone());
        Self { config, state }
    }

    /// Build the router with all routes and middleware
    pub fn router(state: AppState, config: &ServerConfig) -> Router {
        let router = routes::routes()
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        if config.enable_cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = Self::router(self.state.clone(), &self.config.server);

        tracing::info!("Starting RAG server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}
