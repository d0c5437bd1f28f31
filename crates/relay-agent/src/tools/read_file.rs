use relay_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::AllowedRoot;

#[derive(Deserialize, JsonSchema)]
pub struct ReadFileParameters {
    #[schemars(description = "Path of the file, relative to the allowed root.")]
    path: String,
}

/// A tool for reading the whole content of a text file.
pub struct ReadFileTool {
    root: AllowedRoot,
    parameter_schema: Value,
}

impl ReadFileTool {
    /// Creates a new read file tool confined to `root`.
    #[inline]
    pub fn new(root: AllowedRoot) -> Self {
        ReadFileTool {
            root,
            parameter_schema: schema_for!(ReadFileParameters).to_value(),
        }
    }
}

impl Tool for ReadFileTool {
    type Input = ReadFileParameters;

    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads a text file and returns its content."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ReadFileParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let root = self.root.clone();
        async move {
            let path = root.resolve(&input.path)?;
            debug!(path = %path.display(), "reading file");
            tokio::fs::read_to_string(&path).await.map_err(|err| {
                ToolError::execution_error()
                    .with_reason(format!("read file failed: {err}"))
            })
        }
    }
}
