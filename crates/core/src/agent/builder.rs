use std::sync::Arc;

use relay_agent_model::ModelProvider;
use relay_agent_retrieval::RetrievalEngine;

use super::Agent;
use crate::model_client::ModelClient;
use crate::source::SourceConfig;
use crate::tool::{Tool, ToolInfo};

/// [`Agent`] builder.
pub struct AgentBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) system_prompt: Option<String>,
    pub(crate) tools: Vec<ToolInfo>,
    pub(crate) sources: Vec<SourceConfig>,
    pub(crate) retrieval: Option<(Arc<RetrievalEngine>, usize)>,
    pub(crate) max_iterations: usize,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            system_prompt: None,
            tools: vec![],
            sources: vec![],
            retrieval: None,
            max_iterations: 100,
        }
    }

    /// Sets the system prompt sent ahead of every conversation.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into()).filter(|p| !p.is_empty());
        self
    }

    /// Registers an in-process tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(ToolInfo::local(tool));
        self
    }

    /// Adds a capability source, connected when the agent starts.
    #[inline]
    pub fn with_source(mut self, config: SourceConfig) -> Self {
        self.sources.push(config);
        self
    }

    /// Enables retrieval, returning `top_k` chunks per query.
    #[inline]
    pub fn with_retrieval(
        mut self,
        engine: Arc<RetrievalEngine>,
        top_k: usize,
    ) -> Self {
        self.retrieval = Some((engine, top_k));
        self
    }

    /// Sets the maximum number of model round trips in one chat.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets how many times a transient model failure is retried.
    #[inline]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.model_client = self.model_client.with_max_retries(max_retries);
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent::from_builder(self)
    }
}
