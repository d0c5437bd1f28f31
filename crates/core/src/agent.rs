mod builder;
mod error;

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use relay_agent_model::{
    ModelMessage, ModelRequest, ModelTool, ToolCallRequest, ToolCallResult,
};
use relay_agent_retrieval::{
    ImportReport, Metadata, RetrievalEngine, SearchResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;

pub use builder::AgentBuilder;
pub use error::AgentError;

use crate::conversation::{Conversation, ConversationStore};
use crate::model_client::ModelClient;
use crate::source::{
    CapabilitySource, SourceConfig, SourceReport, SourceStatus, StartupReport,
};
use crate::tool::{Error as ToolError, ToolRegistry, ToolResult, ToolSummary};

/// A chat request from a caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user message.
    pub message: String,
    /// The conversation to continue, a new one is created if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Overrides the configured model for this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatRequest {
    /// Creates a request starting a new conversation.
    #[inline]
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Continues the conversation with `id`.
    #[inline]
    pub fn in_conversation<S: Into<String>>(mut self, id: S) -> Self {
        self.conversation_id = Some(id.into());
        self
    }
}

/// The final answer of a chat request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Text of the final model reply.
    pub response: String,
    /// Every tool call made while answering, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallInfo>,
    /// The conversation this request belongs to.
    pub conversation_id: String,
}

/// A record of one tool call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallInfo {
    /// Name of the called tool.
    pub tool: String,
    /// Arguments given by the model.
    pub arguments: Value,
    /// The tool output, or `Error: ...` if the call failed.
    pub result: String,
}

/// An agent instance, which owns conversations, tools and capability
/// sources, and drives the model through tool calls until it answers.
///
/// Different conversations are served concurrently. Requests on the same
/// conversation wait for each other.
pub struct Agent {
    model_client: ModelClient,
    system_prompt: Option<String>,
    tools: ToolRegistry,
    conversations: ConversationStore,
    source_configs: Vec<SourceConfig>,
    sources: Mutex<Vec<CapabilitySource>>,
    retrieval: Option<(Arc<RetrievalEngine>, usize)>,
    max_iterations: usize,
}

impl Agent {
    fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            model_client,
            system_prompt,
            tools,
            sources,
            retrieval,
            max_iterations,
        } = builder;

        let registry = ToolRegistry::default();
        for tool in tools {
            registry.register(tool);
        }
        Self {
            model_client,
            system_prompt,
            tools: registry,
            conversations: Default::default(),
            source_configs: sources,
            sources: Default::default(),
            retrieval,
            max_iterations,
        }
    }

    /// Checks the model service and connects the capability sources.
    ///
    /// An unreachable model service fails the startup. Sources are
    /// connected best-effort: failures are reported and logged, and the
    /// tools of the other sources are still registered.
    pub async fn start(&self) -> Result<StartupReport, AgentError> {
        self.model_client
            .health_check()
            .await
            .map_err(AgentError::Unhealthy)?;

        let mut report = StartupReport::default();
        for config in &self.source_configs {
            let status = if !config.enabled {
                debug!(name = %config.name, "skipping disabled source");
                SourceStatus::Disabled
            } else {
                match CapabilitySource::connect(config).await {
                    Ok(source) => {
                        for tool in source.tools() {
                            self.tools.register(tool.clone());
                        }
                        let tools = source.tools().len();
                        self.lock_sources().push(source);
                        SourceStatus::Connected { tools }
                    }
                    Err(err) => {
                        error!(
                            name = %config.name,
                            "failed to start source: {err}"
                        );
                        SourceStatus::Failed {
                            reason: err.to_string(),
                        }
                    }
                }
            };
            report.sources.push(SourceReport {
                name: config.name.clone(),
                status,
            });
        }

        info!(
            sources = report.connected(),
            tools = self.tools.count(),
            "agent started"
        );
        Ok(report)
    }

    /// Shuts down every connected capability source.
    pub async fn stop(&self) {
        let sources = std::mem::take(&mut *self.lock_sources());
        for source in sources {
            source.shutdown().await;
        }
        info!("agent stopped");
    }

    /// Processes a user message and returns the final model reply.
    ///
    /// # Cancel safety
    ///
    /// Dropping the returned future stops the in-flight model or tool
    /// call. Messages appended before that are kept, the interrupted call
    /// leaves no trace in the conversation.
    pub async fn chat(
        &self,
        req: ChatRequest,
    ) -> Result<ChatResponse, AgentError> {
        let conversation =
            self.conversations.get_or_create(req.conversation_id.as_deref());
        self.run_turn(&conversation, req.message, req.model).await
    }

    /// Like [`Agent::chat`], with retrieved reference material prepended
    /// to the user message.
    ///
    /// Falls back to the plain message when retrieval is disabled, finds
    /// nothing or fails.
    pub async fn chat_with_retrieval(
        &self,
        req: ChatRequest,
    ) -> Result<ChatResponse, AgentError> {
        let mut message = req.message;
        if let Some((engine, top_k)) = &self.retrieval {
            match engine.get_context(&message, *top_k).await {
                Ok(context) if !context.is_empty() => {
                    message =
                        format!("{context}\n用户问题 / Question: {message}");
                }
                Ok(_) => debug!("no reference material found"),
                Err(err) => warn!("failed to build retrieval context: {err}"),
            }
        }
        let conversation =
            self.conversations.get_or_create(req.conversation_id.as_deref());
        self.run_turn(&conversation, message, req.model).await
    }

    async fn run_turn(
        &self,
        conversation: &Conversation,
        message: String,
        model: Option<String>,
    ) -> Result<ChatResponse, AgentError> {
        let span = info_span!("chat", conversation = conversation.id());
        async move {
            let _turn = conversation.lock_turn().await;
            conversation.push(ModelMessage::User(message));

            let tools = self.tools.definitions();
            let mut trace = vec![];
            for iteration in 0..self.max_iterations {
                let req = self.build_model_request(
                    conversation,
                    &tools,
                    model.as_deref(),
                );
                let resp = self
                    .model_client
                    .send_request(&req)
                    .await
                    .map_err(AgentError::Model)?;

                let tool_calls = resp.tool_calls;
                conversation.push(ModelMessage::Assistant {
                    content: resp.content.clone(),
                    tool_calls: tool_calls.clone(),
                });
                if tool_calls.is_empty() {
                    debug!(iterations = iteration + 1, "turn finished");
                    return Ok(ChatResponse {
                        response: resp.content,
                        tool_calls: trace,
                        conversation_id: conversation.id().to_owned(),
                    });
                }

                debug!("processing {} tool calls", tool_calls.len());
                for call in tool_calls {
                    let result = match self.execute_tool_call(&call).await {
                        Ok(output) => output,
                        Err(err) => {
                            warn!(
                                tool = %call.name,
                                "tool call failed: {err}"
                            );
                            format!("Error: {err}")
                        }
                    };
                    trace.push(ToolCallInfo {
                        tool: call.name.clone(),
                        arguments: call.arguments,
                        result: result.clone(),
                    });
                    conversation.push(ModelMessage::Tool(ToolCallResult {
                        id: call.id,
                        name: call.name,
                        content: result,
                    }));
                }
            }

            error!("max iterations reached");
            Err(AgentError::MaxIterations(self.max_iterations))
        }
        .instrument(span)
        .await
    }

    fn build_model_request(
        &self,
        conversation: &Conversation,
        tools: &[ModelTool],
        model: Option<&str>,
    ) -> ModelRequest {
        let mut messages = vec![];
        if let Some(prompt) = &self.system_prompt {
            messages.push(ModelMessage::System(prompt.clone()));
        }
        messages.extend(conversation.messages());
        ModelRequest {
            model: model.map(str::to_owned),
            messages,
            tools: tools.to_vec(),
        }
    }

    async fn execute_tool_call(&self, call: &ToolCallRequest) -> ToolResult {
        let Some(tool) = self.tools.get(&call.name) else {
            return Err(ToolError::not_found().with_reason(&call.name));
        };
        tool.execute(call.arguments.clone()).await
    }

    /// Returns the summaries of all available tools.
    #[inline]
    pub fn list_tools(&self) -> Vec<ToolSummary> {
        self.tools.summaries()
    }

    /// Returns the tool registry.
    #[inline]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Looks up a conversation.
    #[inline]
    pub fn conversation(&self, id: &str) -> Option<Arc<Conversation>> {
        self.conversations.get(id)
    }

    /// Returns the retrieval engine, if enabled.
    #[inline]
    pub fn retrieval(&self) -> Option<&Arc<RetrievalEngine>> {
        self.retrieval.as_ref().map(|(engine, _)| engine)
    }

    fn engine(&self) -> Result<(&RetrievalEngine, usize), AgentError> {
        self.retrieval
            .as_ref()
            .map(|(engine, top_k)| (engine.as_ref(), *top_k))
            .ok_or(AgentError::RetrievalDisabled)
    }

    /// Splits and stores a document for retrieval.
    pub async fn add_document(
        &self,
        id: &str,
        content: &str,
        metadata: Metadata,
    ) -> Result<usize, AgentError> {
        let (engine, _) = self.engine()?;
        Ok(engine.add_document(id, content, metadata).await?)
    }

    /// Stores a document already split into chunks.
    pub async fn add_document_chunks(
        &self,
        id: &str,
        chunks: Vec<String>,
        metadata: Metadata,
    ) -> Result<usize, AgentError> {
        let (engine, _) = self.engine()?;
        Ok(engine.add_document_with_chunks(id, chunks, metadata).await?)
    }

    /// Returns the chunks most similar to `query`.
    pub async fn search(
        &self,
        query: &str,
    ) -> Result<Vec<SearchResult>, AgentError> {
        let (engine, top_k) = self.engine()?;
        Ok(engine.search(query, top_k).await?)
    }

    /// Imports the `.md` files of a directory.
    pub async fn load_documents_from_dir(
        &self,
        dir: impl AsRef<Path>,
    ) -> Result<ImportReport, AgentError> {
        let (engine, _) = self.engine()?;
        Ok(engine.load_documents_from_dir(dir).await?)
    }

    /// Returns the number of stored chunks.
    pub fn document_count(&self) -> Result<usize, AgentError> {
        Ok(self.engine()?.0.document_count())
    }

    /// Drops every stored chunk.
    pub fn clear_documents(&self) -> Result<(), AgentError> {
        self.engine()?.0.clear();
        Ok(())
    }

    fn lock_sources(
        &self,
    ) -> std::sync::MutexGuard<'_, Vec<CapabilitySource>> {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
