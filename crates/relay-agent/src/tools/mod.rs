//! A set of built-in file tools that models can use.
//!
//! All of them are confined to an [`AllowedRoot`]: the model passes paths
//! relative to the root, and paths escaping it are rejected. The same tools
//! can be registered in-process or served to other agents over MCP by
//! [`FileToolServer`].

mod list_directory;
mod mcp;
mod read_file;
mod write_file;

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

pub use list_directory::ListDirectoryTool;
pub use mcp::FileToolServer;
pub use read_file::ReadFileTool;
use relay_agent_core::tool::Error as ToolError;
pub use write_file::WriteFileTool;

/// A directory the file tools are confined to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowedRoot(Arc<PathBuf>);

impl AllowedRoot {
    /// Creates a root from an existing directory.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self(Arc::new(root)))
    }

    /// Returns the root directory.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Resolves `path` against the root.
    ///
    /// Leading separators are ignored, so `/a` and `a` both name `a` under
    /// the root. `..` components are folded lexically and must not climb
    /// above the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let mut parts: Vec<&std::ffi::OsStr> = vec![];
        for component in Path::new(path).components() {
            match component {
                Component::Prefix(_) | Component::RootDir => {}
                Component::CurDir => {}
                Component::ParentDir => {
                    if parts.pop().is_none() {
                        return Err(access_denied());
                    }
                }
                Component::Normal(part) => parts.push(part),
            }
        }
        let mut resolved = self.0.as_ref().clone();
        resolved.extend(parts);
        Ok(resolved)
    }
}

fn access_denied() -> ToolError {
    ToolError::invalid_input()
        .with_reason("access denied: path outside allowed root")
}
