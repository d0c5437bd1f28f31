//! Serves the file tools over MCP on stdin and stdout.
//!
//! Meant to be launched by an agent as a capability source. Logs go to
//! stderr since stdout carries the protocol.

#[macro_use]
extern crate tracing;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use relay_agent::tools::{AllowedRoot, FileToolServer};
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Serves file tools over MCP on stdio")]
struct Cli {
    /// Directory the tools are confined to. Defaults to the system
    /// temporary directory.
    #[arg(long)]
    allow_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let allow_root = cli.allow_root.unwrap_or_else(std::env::temp_dir);
    let root = AllowedRoot::new(&allow_root).with_context(|| {
        format!("allowed root {} not found", allow_root.display())
    })?;
    info!(root = %root.path().display(), "starting MCP file server");

    let service = FileToolServer::new(root)
        .serve(stdio())
        .await
        .context("MCP handshake failed")?;
    let reason = service.waiting().await.context("MCP server failed")?;
    info!(?reason, "MCP file server stopped");
    Ok(())
}
