//! RAG query server
//!
//! Run with: cargo run -p rag-assistant --bin rag-server

use rag_assistant::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_assistant=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RagConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Backend: {:?}", config.backend);
    tracing::info!("  - Project: {} ({})", config.gcp.project_id, config.gcp.location);
    tracing::info!("  - Bucket: {}", config.gcp.bucket_name());
    tracing::info!("  - Generation model: {}", config.models.generation_model);
    tracing::info!("  - Top-k: {}", config.retrieval.top_k);

    // The pipeline is built by the first request, not here
    let server = RagServer::new(config);

    tracing::info!("Listening on http://{}", server.address());
    tracing::info!("  POST /        - ask a question ({{\"query\": \"...\"}})");
    tracing::info!("  GET  /health  - liveness");

    server.start().await?;

    Ok(())
}
