//! Tool call supports.
//!
//! Tools come from two places: in-process [`Tool`] implementations and
//! tools advertised by capability sources. Both end up as a [`ToolInfo`]
//! in the [`ToolRegistry`], executed through a [`ToolExecutor`].

mod error;
mod registry;
pub mod schema;

use std::fmt::{self, Debug, Display};
use std::pin::Pin;
use std::sync::Arc;

use relay_agent_model::ModelTool;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::Instrument;

pub use error::{Error, ErrorKind};
pub use registry::ToolRegistry;
pub use crate::source::RemoteTool;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless, and may not maintain any
/// internal state.
///
/// The tool can be context-aware, meaning it can access additional information
/// about the current execution context, such as the working directory or the
/// current user. To do this, make the context an immutable state of the tool,
/// which can be set during initialization, and copy it when executing.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}

trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> &Value;

    fn execute(
        &self,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>>;
}

struct AnyTool<T: Tool>(T);

impl<T: Tool> ToolObject for AnyTool<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    #[inline]
    fn execute(
        &self,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> {
        let input: T::Input = match serde_json::from_value(arguments) {
            Ok(input) => input,
            Err(err) => {
                let reason = format!("{err}");
                return Box::pin(std::future::ready(ToolResult::Err(
                    Error::invalid_input().with_reason(reason),
                )));
            }
        };
        Box::pin(self.0.execute(input))
    }
}

/// An in-process tool with its input type erased.
#[derive(Clone)]
pub struct LocalTool(Arc<dyn ToolObject>);

impl LocalTool {
    /// Wraps a typed tool.
    #[inline]
    pub fn new<T: Tool>(tool: T) -> Self {
        Self(Arc::new(AnyTool(tool)))
    }
}

impl Debug for LocalTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalTool").field(&self.0.name()).finish()
    }
}

/// Runs a tool call, either in-process or through a capability source.
#[derive(Clone, Debug)]
pub enum ToolExecutor {
    /// An in-process tool.
    Local(LocalTool),
    /// A tool living in a capability source process.
    Remote(RemoteTool),
}

impl ToolExecutor {
    /// Executes the tool with raw JSON arguments.
    pub fn execute(
        &self,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> {
        match self {
            ToolExecutor::Local(tool) => tool.0.execute(arguments),
            ToolExecutor::Remote(tool) => {
                let tool = tool.clone();
                Box::pin(async move { tool.call(arguments).await })
            }
        }
    }
}

/// Where a tool comes from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ToolSource {
    /// Built into this process.
    Local,
    /// Advertised by the named capability source.
    Remote {
        /// Name of the capability source.
        server: String,
    },
}

impl Display for ToolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolSource::Local => write!(f, "local"),
            ToolSource::Remote { server } => write!(f, "mcp:{server}"),
        }
    }
}

impl Serialize for ToolSource {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A registered tool.
#[derive(Clone, Debug)]
pub struct ToolInfo {
    /// Unique name of the tool.
    pub name: String,
    /// Description shown to the model.
    pub description: String,
    /// The declared parameter schema, as advertised by the tool.
    pub input_schema: Value,
    /// Origin of the tool.
    pub source: ToolSource,
    /// The bound executor.
    pub executor: ToolExecutor,
}

impl ToolInfo {
    /// Creates a `ToolInfo` for an in-process tool.
    pub fn local<T: Tool>(tool: T) -> Self {
        let tool = LocalTool::new(tool);
        Self {
            name: tool.0.name().to_owned(),
            description: tool.0.description().to_owned(),
            input_schema: tool.0.parameter_schema().clone(),
            source: ToolSource::Local,
            executor: ToolExecutor::Local(tool),
        }
    }

    /// Returns the descriptor sent to the model.
    #[inline]
    pub fn definition(&self) -> ModelTool {
        schema::convert(&self.name, &self.description, &self.input_schema)
    }

    /// Returns the caller-facing summary of this tool.
    #[inline]
    pub fn summary(&self) -> ToolSummary {
        ToolSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            source: self.source.clone(),
        }
    }

    /// Executes this tool, logging the call.
    pub async fn execute(&self, arguments: Value) -> ToolResult {
        let span = debug_span!(
            "tool execute",
            name = %self.name,
            source = %self.source
        );
        trace!("executing tool with args: {arguments:?}");
        self.executor.execute(arguments).instrument(span).await
    }
}

/// The caller-facing description of a tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolSummary {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Origin of the tool, `local` or `mcp:<server>`.
    pub source: ToolSource,
}
