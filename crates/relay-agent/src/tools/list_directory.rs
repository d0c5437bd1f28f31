use relay_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::AllowedRoot;

#[derive(Deserialize, JsonSchema)]
pub struct ListDirectoryParameters {
    #[schemars(
        description = "Path of the directory, relative to the allowed root."
    )]
    path: String,
}

/// A tool for listing the entries of a directory.
pub struct ListDirectoryTool {
    root: AllowedRoot,
    parameter_schema: Value,
}

impl ListDirectoryTool {
    /// Creates a new list directory tool confined to `root`.
    #[inline]
    pub fn new(root: AllowedRoot) -> Self {
        ListDirectoryTool {
            root,
            parameter_schema: schema_for!(ListDirectoryParameters).to_value(),
        }
    }
}

impl Tool for ListDirectoryTool {
    type Input = ListDirectoryParameters;

    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        r#"
Lists the entries of a directory, one per line as `name (file)` or
`name (directory)`."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ListDirectoryParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let root = self.root.clone();
        async move {
            let path = root.resolve(&input.path)?;
            debug!(path = %path.display(), "listing directory");
            let read_error = |err: std::io::Error| {
                ToolError::execution_error()
                    .with_reason(format!("read directory failed: {err}"))
            };

            let mut dir = tokio::fs::read_dir(&path).await.map_err(read_error)?;
            let mut entries = vec![];
            while let Some(entry) = dir.next_entry().await.map_err(read_error)? {
                let is_dir = entry
                    .file_type()
                    .await
                    .map_err(read_error)?
                    .is_dir();
                let name = entry.file_name().to_string_lossy().into_owned();
                entries.push((name, is_dir));
            }
            entries.sort();

            let mut result = String::new();
            for (name, is_dir) in entries {
                let kind = if is_dir { "directory" } else { "file" };
                result.push_str(&format!("{name} ({kind})\n"));
            }
            Ok(result)
        }
    }
}
