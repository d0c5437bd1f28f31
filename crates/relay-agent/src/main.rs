//! Runs the agent as an HTTP service.

#[macro_use]
extern crate tracing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use relay_agent::config::AppConfig;
use relay_agent::{build_agent, server};
use relay_agent_core::Agent;
use relay_agent_ollama_model::{
    OllamaConfigBuilder, OllamaEmbedder, OllamaProvider,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "A tool-using chat agent served over HTTP")]
struct Cli {
    /// Path of the YAML configuration file.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    let default_level = if config.server.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
    info!(
        name = %config.server.name,
        version = %config.server.version,
        "starting"
    );

    let ollama_config = OllamaConfigBuilder::with_host(&config.ollama.host)
        .with_model(&config.ollama.model)
        .with_timeout(config.ollama.timeout())
        .build();
    let embedder =
        OllamaEmbedder::new(ollama_config.clone(), &config.rag.embed_model)?;
    let provider = OllamaProvider::new(ollama_config)?;
    let agent = Arc::new(
        build_agent(&config, provider, Arc::new(embedder))
            .context("failed to set up the file tools")?,
    );

    let report = agent
        .start()
        .await
        .context("failed to connect to the model service")?;
    info!(sources = report.connected(), "capability sources ready");
    import_documents(&agent, &config.rag.documents_dir).await;

    let listener = TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| {
            format!("failed to listen on {}", config.server.listen)
        })?;
    info!(listen = %config.server.listen, "ready");
    let served = axum::serve(listener, server::router(agent.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    agent.stop().await;
    served.context("HTTP server failed")?;
    info!("shutdown complete");
    Ok(())
}

async fn import_documents(agent: &Agent, dir: &Path) {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "no documents directory");
        return;
    }
    match agent.load_documents_from_dir(dir).await {
        Ok(report) => info!(
            dir = %dir.display(),
            loaded = report.loaded(),
            skipped = report.skipped(),
            "documents imported"
        ),
        Err(err) => warn!(dir = %dir.display(), "failed to import: {err}"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}
