use std::sync::Arc;

use relay_agent_core::tool::{Tool, ToolResult};
use rmcp::handler::server::{tool::ToolRouter, wrapper::Parameters};
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion,
    ServerCapabilities, ServerInfo,
};
use rmcp::{ServerHandler, tool, tool_handler, tool_router};

use super::list_directory::ListDirectoryParameters;
use super::read_file::ReadFileParameters;
use super::write_file::WriteFileParameters;
use super::{AllowedRoot, ListDirectoryTool, ReadFileTool, WriteFileTool};

/// An MCP server exposing the file tools of one [`AllowedRoot`].
///
/// A failed tool call is answered with an error result carrying the
/// failure reason, so the session stays usable.
#[derive(Clone)]
pub struct FileToolServer {
    read_file: Arc<ReadFileTool>,
    write_file: Arc<WriteFileTool>,
    list_directory: Arc<ListDirectoryTool>,
    tool_router: ToolRouter<Self>,
}

impl FileToolServer {
    /// Creates a server whose tools are confined to `root`.
    pub fn new(root: AllowedRoot) -> Self {
        Self {
            read_file: Arc::new(ReadFileTool::new(root.clone())),
            write_file: Arc::new(WriteFileTool::new(root.clone())),
            list_directory: Arc::new(ListDirectoryTool::new(root)),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl FileToolServer {
    #[tool(
        name = "read_file",
        description = "Reads a text file and returns its content."
    )]
    async fn read_file(
        &self,
        params: Parameters<ReadFileParameters>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        info!("MCP tool called: read_file");
        Ok(call_result(self.read_file.execute(params.0).await))
    }

    #[tool(
        name = "write_file",
        description = "Writes content to a file, creating it and its parent directories if needed."
    )]
    async fn write_file(
        &self,
        params: Parameters<WriteFileParameters>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        info!("MCP tool called: write_file");
        Ok(call_result(self.write_file.execute(params.0).await))
    }

    #[tool(
        name = "list_directory",
        description = "Lists the entries of a directory, one per line as `name (file)` or `name (directory)`."
    )]
    async fn list_directory(
        &self,
        params: Parameters<ListDirectoryParameters>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        info!("MCP tool called: list_directory");
        Ok(call_result(self.list_directory.execute(params.0).await))
    }
}

#[tool_handler]
impl ServerHandler for FileToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "relay-agent-mcp-server".into(),
                title: None,
                version: env!("CARGO_PKG_VERSION").into(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "File tools confined to a single directory. Paths are \
                 relative to that directory."
                    .into(),
            ),
        }
    }
}

fn call_result(result: ToolResult) -> CallToolResult {
    match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(err) => {
            warn!("MCP tool failed: {err}");
            CallToolResult::error(vec![Content::text(err.reason())])
        }
    }
}

#[cfg(test)]
mod tests {
    use relay_agent_core::tool::Error as ToolError;
    use rmcp::model::RawContent;

    use super::*;

    #[test]
    fn test_registered_tools() {
        let dir = tempfile::tempdir().unwrap();
        let server = FileToolServer::new(AllowedRoot::new(dir.path()).unwrap());
        let mut names: Vec<_> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, ["list_directory", "read_file", "write_file"]);
    }

    #[test]
    fn test_call_result() {
        let result = call_result(Ok("hello".to_owned()));
        assert_eq!(result.is_error, Some(false));

        let result = call_result(Err(ToolError::invalid_input()
            .with_reason("access denied: path outside allowed root")));
        assert_eq!(result.is_error, Some(true));
        let RawContent::Text(text) = &result.content[0].raw else {
            panic!("expected text content, got {:?}", result.content);
        };
        assert_eq!(text.text, "access denied: path outside allowed root");
    }
}
