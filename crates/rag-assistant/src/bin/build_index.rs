//! Offline index build job
//!
//! Run with: cargo run -p rag-assistant --bin rag-build-index -- --source paper.pdf

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;

use rag_assistant::config::RagConfig;
use rag_assistant::indexing::{BuildTarget, IndexBuilder};
use rag_assistant::providers::Providers;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "rag-build-index",
    about = "Summarize and embed a document, then persist the index artifact"
)]
struct Cli {
    /// Document URL or local path (defaults to the configured source)
    #[arg(long)]
    source: Option<String>,

    /// Also write the artifact files into this directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Skip uploading to the artifact store
    #[arg(long, default_value_t = false)]
    no_upload: bool,

    /// Summary requests in flight at once
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_assistant=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if cli.no_upload && cli.output_dir.is_none() {
        bail!("--no-upload needs --output-dir, otherwise the index goes nowhere");
    }

    let mut config = RagConfig::load()?;
    if let Some(concurrency) = cli.concurrency {
        config.indexing.summary_concurrency = concurrency;
    }
    let source = cli.source.unwrap_or_else(|| config.indexing.source.clone());

    tracing::info!("--- Starting Index Build Job ---");

    let providers = Providers::from_config(&config)
        .await
        .context("failed to initialize providers")?;
    let builder = IndexBuilder::new(config, &providers)?;

    let target = BuildTarget {
        upload: !cli.no_upload,
        output_dir: cli.output_dir,
    };
    let report = builder
        .run(&source, &target)
        .await
        .with_context(|| format!("index build failed for {}", source))?;

    tracing::info!(
        "Indexed {} units ({} dimensions)",
        report.units,
        report.dimensions.unwrap_or(0)
    );
    if let Some(location) = &report.uploaded {
        tracing::info!("Uploaded {} and {}", location.embeddings_uri, location.texts_uri);
    }
    if let Some(location) = &report.written {
        tracing::info!("Wrote {} and {}", location.embeddings_uri, location.texts_uri);
    }
    tracing::info!("--- Index Build Job Complete ---");

    Ok(())
}
