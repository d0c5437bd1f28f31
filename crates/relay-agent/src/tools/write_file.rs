use relay_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::AllowedRoot;

#[derive(Deserialize, JsonSchema)]
pub struct WriteFileParameters {
    #[schemars(description = "Path of the file, relative to the allowed root.")]
    path: String,
    #[schemars(description = "Content to write. Replaces the existing file.")]
    content: String,
}

/// A tool for writing a text file, creating missing parent directories.
pub struct WriteFileTool {
    root: AllowedRoot,
    parameter_schema: Value,
}

impl WriteFileTool {
    /// Creates a new write file tool confined to `root`.
    #[inline]
    pub fn new(root: AllowedRoot) -> Self {
        WriteFileTool {
            root,
            parameter_schema: schema_for!(WriteFileParameters).to_value(),
        }
    }
}

impl Tool for WriteFileTool {
    type Input = WriteFileParameters;

    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Writes content to a file, creating it and its parent directories \
         if needed."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: WriteFileParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let root = self.root.clone();
        async move {
            let path = root.resolve(&input.path)?;
            debug!(
                path = %path.display(),
                size = input.content.len(),
                "writing file"
            );
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|err| {
                    ToolError::execution_error()
                        .with_reason(format!("create directory failed: {err}"))
                })?;
            }
            tokio::fs::write(&path, input.content.as_bytes())
                .await
                .map_err(|err| {
                    ToolError::execution_error()
                        .with_reason(format!("write file failed: {err}"))
                })?;
            Ok(format!(
                "Successfully wrote {} bytes to {}",
                input.content.len(),
                input.path
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(AllowedRoot::new(dir.path()).unwrap());

        let message = tool
            .execute(WriteFileParameters {
                path: "out/nested/hello.txt".to_owned(),
                content: "hello".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(message, "Successfully wrote 5 bytes to out/nested/hello.txt");
        let written =
            std::fs::read_to_string(dir.path().join("out/nested/hello.txt"))
                .unwrap();
        assert_eq!(written, "hello");
    }

    #[tokio::test]
    async fn test_write_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = AllowedRoot::new(dir.path().join(".")).unwrap();
        let tool = WriteFileTool::new(root);

        let err = tool
            .execute(WriteFileParameters {
                path: "../escaped.txt".to_owned(),
                content: "nope".to_owned(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("access denied"));
        assert!(!dir.path().join("../escaped.txt").exists());
    }
}
