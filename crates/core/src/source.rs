//! Capability sources: external processes offering tools over MCP.

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use rmcp::ServiceExt;
use rmcp::model::{CallToolRequestParams, CallToolResult, RawContent};
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tool::{
    Error as ToolError, ToolExecutor, ToolInfo, ToolResult, ToolSource,
};

/// How to launch and reach a capability source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Name of the source, used in tool sources as `mcp:<name>`.
    pub name: String,
    /// The program to launch.
    pub command: String,
    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables for the program.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Transport kind, only `stdio` is supported.
    #[serde(default = "default_transport")]
    pub transport: String,
    /// Disabled sources are never launched.
    #[serde(default)]
    pub enabled: bool,
}

fn default_transport() -> String {
    "stdio".to_owned()
}

/// Errors raised while connecting to a capability source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The configured transport is not supported.
    #[error("unsupported transport: {0}")]
    UnsupportedTransport(String),

    /// The process could not be launched.
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        /// The program that was launched.
        command: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The protocol handshake failed.
    #[error("connect failed: {0}")]
    Initialize(String),

    /// Tool discovery failed.
    #[error("list tools failed: {0}")]
    ListTools(String),
}

type ClientService = RunningService<RoleClient, ()>;

/// A connected capability source.
///
/// Owns the child process and its protocol session. The process is killed
/// when the session is shut down or the source is dropped.
pub struct CapabilitySource {
    name: String,
    service: Mutex<Option<ClientService>>,
    tools: Vec<ToolInfo>,
}

impl CapabilitySource {
    /// Launches the source process, establishes a session and discovers its
    /// tools.
    pub async fn connect(config: &SourceConfig) -> Result<Self, SourceError> {
        if !config.transport.is_empty() && config.transport != "stdio" {
            return Err(SourceError::UnsupportedTransport(
                config.transport.clone(),
            ));
        }
        info!(
            name = %config.name,
            command = %config.command,
            args = ?config.args,
            "starting capability source"
        );

        let mut cmd = tokio::process::Command::new(&config.command);
        cmd.args(&config.args).envs(&config.env).kill_on_drop(true);
        let transport =
            TokioChildProcess::new(cmd).map_err(|source| SourceError::Spawn {
                command: config.command.clone(),
                source,
            })?;
        let service = ()
            .serve(transport)
            .await
            .map_err(|err| SourceError::Initialize(err.to_string()))?;

        let listed = match service.list_tools(Default::default()).await {
            Ok(listed) => listed,
            Err(err) => {
                if let Err(err) = service.cancel().await {
                    warn!("failed to close session: {err}");
                }
                return Err(SourceError::ListTools(err.to_string()));
            }
        };

        let server: Arc<str> = Arc::from(config.name.as_str());
        let tools = listed
            .tools
            .into_iter()
            .map(|tool| {
                let name = tool.name.to_string();
                ToolInfo {
                    description: tool
                        .description
                        .map(|desc| desc.to_string())
                        .unwrap_or_default(),
                    input_schema: Value::Object((*tool.input_schema).clone()),
                    source: ToolSource::Remote {
                        server: config.name.clone(),
                    },
                    executor: ToolExecutor::Remote(RemoteTool {
                        server: Arc::clone(&server),
                        tool: name.clone(),
                        peer: service.peer().clone(),
                    }),
                    name,
                }
            })
            .collect::<Vec<_>>();
        info!(
            name = %config.name,
            tools = tools.len(),
            "capability source connected"
        );

        Ok(Self {
            name: config.name.clone(),
            service: Mutex::new(Some(service)),
            tools,
        })
    }

    /// Returns the name of this source.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tools discovered at connect time.
    #[inline]
    pub fn tools(&self) -> &[ToolInfo] {
        &self.tools
    }

    /// Closes the session and terminates the process.
    ///
    /// Errors are logged only. Calling this more than once is a no-op.
    pub async fn shutdown(&self) {
        let service = self
            .service
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(service) = service else {
            return;
        };
        match service.cancel().await {
            Ok(reason) => {
                debug!(name = %self.name, ?reason, "capability source stopped")
            }
            Err(err) => warn!(
                name = %self.name,
                "failed to stop capability source: {err}"
            ),
        }
    }
}

impl Debug for CapabilitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitySource")
            .field("name", &self.name)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

/// A tool invoked through a capability source session.
#[derive(Clone)]
pub struct RemoteTool {
    server: Arc<str>,
    tool: String,
    peer: Peer<RoleClient>,
}

impl RemoteTool {
    /// Calls the tool and waits for its single response.
    pub async fn call(&self, arguments: Value) -> ToolResult {
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(ToolError::invalid_input().with_reason(format!(
                    "arguments must be an object, got {other}"
                )));
            }
        };
        info!(
            server = %self.server,
            tool = %self.tool,
            args = ?arguments,
            "calling remote tool"
        );

        let started = Instant::now();
        let result = self
            .peer
            .call_tool(CallToolRequestParams {
                meta: None,
                name: self.tool.clone().into(),
                arguments,
                task: None,
            })
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(result) => {
                info!(
                    server = %self.server,
                    tool = %self.tool,
                    elapsed_ms,
                    "remote tool call completed"
                );
                text_of(result)
            }
            Err(err) => {
                error!(
                    server = %self.server,
                    tool = %self.tool,
                    elapsed_ms,
                    "remote tool call failed: {err}"
                );
                Err(ToolError::execution_error()
                    .with_reason(format!("call tool failed: {err}")))
            }
        }
    }
}

impl Debug for RemoteTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTool")
            .field("server", &self.server)
            .field("tool", &self.tool)
            .finish_non_exhaustive()
    }
}

/// Extracts the first text content of a call result.
fn text_of(result: CallToolResult) -> ToolResult {
    let text = result
        .content
        .into_iter()
        .find_map(|content| match content.raw {
            RawContent::Text(text) => Some(text.text),
            _ => None,
        });
    match (text, result.is_error) {
        (Some(text), Some(true)) => {
            Err(ToolError::execution_error().with_reason(text))
        }
        (Some(text), _) => Ok(text),
        (None, _) => Err(ToolError::execution_error()
            .with_reason("no text content in result")),
    }
}

/// The outcome of starting one capability source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// The source is running and its tools are registered.
    Connected {
        /// Number of tools it advertised.
        tools: usize,
    },
    /// The source is disabled in the configuration.
    Disabled,
    /// The source could not be started.
    Failed {
        /// Why it failed.
        reason: String,
    },
}

/// The outcome of starting a named capability source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    /// Name of the source.
    pub name: String,
    /// What happened to it.
    #[serde(flatten)]
    pub status: SourceStatus,
}

/// The per-source outcomes of starting an agent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StartupReport {
    /// One entry per configured source, in configuration order.
    pub sources: Vec<SourceReport>,
}

impl StartupReport {
    /// Returns the number of connected sources.
    pub fn connected(&self) -> usize {
        self.sources
            .iter()
            .filter(|report| {
                matches!(report.status, SourceStatus::Connected { .. })
            })
            .count()
    }
}
