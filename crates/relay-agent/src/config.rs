//! YAML configuration of the service.

use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_agent_core::source::SourceConfig;
use relay_agent_retrieval::RetrievalConfig;
use serde::{Deserialize, Serialize};

const DEFAULT_SYSTEM_PROMPT: &str = "\
你是一个高效的AI助手，具备以下特性：
- 深度理解用户需求，避免不必要的重复工具调用
- 优先查看对话历史，利用已有信息回答问题
- 只在确实需要时才调用工具，避免盲目探索
- 支持批量工具调用，提高执行效率
- 提供清晰、准确的最终回答，简要说明工具使用情况
- 分析项目的时候需要读取项目中的每一个文件(递归遍历，特别是项目代码文件)";

/// Errors raised while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The file is not valid YAML or has unexpected fields.
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying error.
        source: serde_yaml::Error,
    },
    /// A required value is missing.
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// The root configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Model service settings.
    pub ollama: OllamaSettings,
    /// External capability sources.
    pub mcp_servers: Vec<SourceConfig>,
    /// Retrieval settings.
    pub rag: RagConfig,
    /// Built-in file tools.
    pub tools: ToolsConfig,
}

/// HTTP server settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Display name of the service.
    pub name: String,
    /// Version reported at startup.
    pub version: String,
    /// Address to listen on.
    pub listen: String,
    /// Enables debug logging.
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "AIAgent".to_owned(),
            version: "v1.0.0".to_owned(),
            listen: "localhost:8080".to_owned(),
            debug: false,
        }
    }
}

/// Model service settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    /// Base URL of the Ollama service.
    pub host: String,
    /// Chat model name.
    pub model: String,
    /// Timeout of one HTTP request, in seconds.
    pub timeout_secs: u64,
    /// How many times a transient model failure is retried.
    pub max_retries: u32,
    /// Instructions sent ahead of every conversation.
    pub system_prompt: String,
}

impl OllamaSettings {
    /// Returns the request timeout.
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_owned(),
            model: "qwen3-coder:480b-cloud".to_owned(),
            timeout_secs: 120,
            max_retries: 3,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
        }
    }
}

/// Retrieval settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Embedding model name.
    pub embed_model: String,
    /// Maximum number of characters in a chunk.
    pub chunk_size: usize,
    /// Characters shared by adjacent chunks.
    pub chunk_overlap: usize,
    /// Number of chunks used to answer a question.
    pub top_k: usize,
    /// Directory of `.md` files imported at startup.
    pub documents_dir: PathBuf,
}

impl RagConfig {
    /// Returns the chunking options.
    #[inline]
    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embed_model: "nomic-embed-text:latest".to_owned(),
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 3,
            documents_dir: PathBuf::from("docs/rag"),
        }
    }
}

/// Built-in file tool settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Registers the file tools when set.
    pub enabled: bool,
    /// Directory the file tools are confined to.
    pub allow_root: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_root: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Reads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?;
        Self::from_yaml(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_owned(),
                source,
            },
            err => err,
        })
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document is `null` in YAML.
        let config: Option<Self> =
            serde_yaml::from_str(content).map_err(|source| {
                ConfigError::Parse {
                    path: PathBuf::new(),
                    source,
                }
            })?;
        let config = config.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ollama.host.trim().is_empty() {
            return Err(ConfigError::Invalid("ollama host is required"));
        }
        if self.ollama.model.trim().is_empty() {
            return Err(ConfigError::Invalid("ollama model is required"));
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::Invalid("rag top_k must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.listen, "localhost:8080");
        assert_eq!(config.ollama.timeout(), Duration::from_secs(120));
        assert!(config.ollama.system_prompt.starts_with("你是一个高效的AI助手"));
        assert_eq!(config.rag.retrieval_config(), RetrievalConfig::default());
        assert!(config.mcp_servers.is_empty());
    }

    #[test]
    fn test_partial_config() {
        let config = AppConfig::from_yaml(
            r#"
server:
  listen: "0.0.0.0:9000"
  debug: true
ollama:
  model: llama3
  max_retries: 5
mcp_servers:
  - name: fs
    command: npx
    args: ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]
    env:
      NODE_ENV: production
    enabled: true
  - name: off
    command: "true"
rag:
  top_k: 5
"#,
        )
        .unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:9000");
        assert_eq!(config.server.name, "AIAgent");
        assert!(config.server.debug);
        assert_eq!(config.ollama.model, "llama3");
        assert_eq!(config.ollama.host, "http://localhost:11434");
        assert_eq!(config.ollama.max_retries, 5);
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.rag.chunk_size, 500);

        let fs = &config.mcp_servers[0];
        assert!(fs.enabled);
        assert_eq!(fs.transport, "stdio");
        assert_eq!(fs.args.len(), 3);
        assert_eq!(fs.env["NODE_ENV"], "production");
        assert!(!config.mcp_servers[1].enabled);
    }

    #[test]
    fn test_validation() {
        let err = AppConfig::from_yaml("ollama:\n  host: \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("ollama host is required")));
        let err = AppConfig::from_yaml("ollama:\n  model: \" \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = AppConfig::from_yaml("server: [1, 2]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load("/nonexistent/config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
