use std::fmt::Debug;
use std::time::Duration;

/// Builder for [`OllamaConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct OllamaConfigBuilder {
    host: Option<String>,
    model: Option<String>,
    timeout: Option<Duration>,
}

impl OllamaConfigBuilder {
    /// Creates a builder pointing to the given Ollama host.
    #[inline]
    pub fn with_host<S: Into<String>>(host: S) -> Self {
        Self {
            host: Some(host.into()),
            ..Default::default()
        }
    }

    /// Sets the chat model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the timeout for a whole HTTP request.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OllamaConfig {
        let host = self
            .host
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        OllamaConfig {
            host: host.trim_end_matches('/').to_owned(),
            model: self
                .model
                .unwrap_or_else(|| "qwen3-coder:480b-cloud".to_string()),
            timeout: self.timeout.unwrap_or(Duration::from_secs(120)),
        }
    }
}

/// Configuration for the Ollama provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OllamaConfig {
    pub(crate) host: String,
    pub(crate) model: String,
    pub(crate) timeout: Duration,
}

impl OllamaConfig {
    /// Returns the base URL of the Ollama service.
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the default chat model.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OllamaConfigBuilder::default().build();
        assert_eq!(config.host(), "http://localhost:11434");
        assert_eq!(config.model(), "qwen3-coder:480b-cloud");
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_trailing_slash() {
        let config = OllamaConfigBuilder::with_host("http://gpu-box:11434/")
            .with_model("llama3")
            .build();
        assert_eq!(config.url("/api/chat"), "http://gpu-box:11434/api/chat");
    }
}
