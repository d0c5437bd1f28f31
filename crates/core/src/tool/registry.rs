use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use relay_agent_model::ModelTool;

use super::{ToolInfo, ToolSummary};

/// Tools available to the model, keyed by name.
///
/// Names are unique across all sources. Registering a name twice keeps
/// the later registration.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<ToolInfo>>>,
}

impl ToolRegistry {
    /// Registers a tool, returning the entry it replaced, if any.
    pub fn register(&self, tool: ToolInfo) -> Option<Arc<ToolInfo>> {
        let name = tool.name.clone();
        let source = tool.source.clone();
        let replaced = self
            .tools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Arc::new(tool));
        if let Some(replaced) = &replaced {
            warn!(
                "tool `{}` from {} is replaced by the one from {source}",
                replaced.name, replaced.source
            );
        }
        replaced
    }

    /// Looks up a tool by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<Arc<ToolInfo>> {
        self.read().get(name).cloned()
    }

    /// Returns all tools ordered by name.
    pub fn list(&self) -> Vec<Arc<ToolInfo>> {
        let mut tools: Vec<_> = self.read().values().cloned().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Returns the model descriptors of all tools, ordered by name.
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.list().iter().map(|tool| tool.definition()).collect()
    }

    /// Returns the summaries of all tools, ordered by name.
    pub fn summaries(&self) -> Vec<ToolSummary> {
        self.list().iter().map(|tool| tool.summary()).collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<ToolInfo>>> {
        self.tools.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::tool::ToolSource;
    use crate::tool::tests::EchoTool;

    #[tokio::test]
    async fn test_last_registration_wins() {
        let registry = ToolRegistry::default();
        let first = registry.register(ToolInfo::local(EchoTool::named("echo")));
        assert!(first.is_none());
        registry.register(ToolInfo::local(EchoTool::named("alpha")));

        let mut remote = ToolInfo::local(EchoTool::named("echo"));
        remote.description = "Remote echo.".to_owned();
        remote.source = ToolSource::Remote {
            server: "files".to_owned(),
        };
        let replaced = registry.register(remote).unwrap();
        assert_eq!(replaced.source, ToolSource::Local);

        assert_eq!(registry.count(), 2);
        let echo = registry.get("echo").unwrap();
        assert_eq!(echo.description, "Remote echo.");
        assert_eq!(echo.source.to_string(), "mcp:files");
        let output = echo.execute(json!({ "text": "still works" })).await;
        assert_eq!(output.unwrap(), "still works");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_definitions_are_sorted() {
        let registry = ToolRegistry::default();
        for name in ["zeta", "alpha", "mu"] {
            registry.register(ToolInfo::local(EchoTool::named(name)));
        }
        let names: Vec<_> = registry
            .definitions()
            .into_iter()
            .map(|tool| tool.name)
            .collect();
        assert_eq!(names, ["alpha", "mu", "zeta"]);
        assert_eq!(registry.summaries()[0].source, ToolSource::Local);
    }
}
