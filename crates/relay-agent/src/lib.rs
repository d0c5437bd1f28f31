//! A tool-using chat agent served over HTTP.
//!
//! The agent talks to an Ollama model, calls the built-in file tools and
//! the tools of external MCP servers, and answers questions from imported
//! documents.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

pub mod config;
pub mod server;
pub mod tools;

use std::sync::Arc;

use relay_agent_core::{Agent, AgentBuilder};
use relay_agent_model::{EmbeddingProvider, ModelProvider};
use relay_agent_retrieval::RetrievalEngine;

use crate::config::AppConfig;
use crate::tools::{
    AllowedRoot, ListDirectoryTool, ReadFileTool, WriteFileTool,
};

/// Assembles an agent from the configuration.
///
/// The built-in file tools fail to register when `tools.allow_root` is not
/// an existing directory. Capability sources are only recorded here, they
/// are connected by [`Agent::start`].
pub fn build_agent<P: ModelProvider + 'static>(
    config: &AppConfig,
    model_provider: P,
    embedder: Arc<dyn EmbeddingProvider>,
) -> std::io::Result<Agent> {
    let engine =
        RetrievalEngine::new(embedder, config.rag.retrieval_config());
    let mut builder = AgentBuilder::with_model_provider(model_provider)
        .with_system_prompt(config.ollama.system_prompt.clone())
        .with_max_retries(config.ollama.max_retries)
        .with_retrieval(Arc::new(engine), config.rag.top_k);

    if config.tools.enabled {
        let root = AllowedRoot::new(&config.tools.allow_root)?;
        info!(root = %root.path().display(), "file tools enabled");
        builder = builder
            .with_tool(ReadFileTool::new(root.clone()))
            .with_tool(WriteFileTool::new(root.clone()))
            .with_tool(ListDirectoryTool::new(root));
    }
    for source in &config.mcp_servers {
        builder = builder.with_source(source.clone());
    }
    Ok(builder.build())
}
