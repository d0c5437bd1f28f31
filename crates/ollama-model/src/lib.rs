//! A model provider for the Ollama HTTP API.
//!
//! [`OllamaProvider`] talks to `/api/chat` without streaming, and
//! [`OllamaEmbedder`] computes vectors through `/api/embed`. Both share
//! the same [`OllamaConfig`].

#[macro_use]
extern crate tracing;

mod config;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use async_trait::async_trait;
use relay_agent_model::{
    EmbeddingProvider, ErrorKind, ModelProvider, ModelProviderError,
    ModelRequest,
};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

pub use config::{OllamaConfig, OllamaConfigBuilder};
use proto::{ChatResponse, EmbedRequest, EmbedResponse};
pub use response::OllamaResponse;

/// Error type for [`OllamaProvider`] and [`OllamaEmbedder`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if let Some(status) = err.status() {
            status_error_kind(status)
        } else if err.is_decode() {
            ErrorKind::InvalidResponse
        } else if err.is_timeout() || err.is_connect() || err.is_request() {
            ErrorKind::Unavailable
        } else {
            ErrorKind::Other
        };
        Self::new(err.to_string(), kind)
    }
}

fn status_error_kind(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimitExceeded,
        StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => ErrorKind::Unavailable,
        _ => ErrorKind::Other,
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, Error> {
    let resp = resp.error_for_status()?;
    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(|err| {
        Error::new(
            format!("malformed response body: {err}"),
            ErrorKind::InvalidResponse,
        )
    })
}

fn build_client(config: &OllamaConfig) -> Result<Client, Error> {
    Ok(Client::builder().timeout(config.timeout).build()?)
}

/// Ollama chat model provider.
#[derive(Clone, Debug)]
pub struct OllamaProvider {
    client: Client,
    config: Arc<OllamaConfig>,
}

impl OllamaProvider {
    /// Creates a new `OllamaProvider` with the given configuration.
    pub fn new(config: OllamaConfig) -> Result<Self, Error> {
        info!(
            host = %config.host,
            model = %config.model,
            "ollama client created"
        );
        Ok(Self {
            client: build_client(&config)?,
            config: Arc::new(config),
        })
    }

    /// Returns the configuration of this provider.
    #[inline]
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

impl ModelProvider for OllamaProvider {
    type Error = Error;
    type Response = OllamaResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let chat_req = proto::create_request(req, &self.config);
        trace!(?chat_req, "ollama chat request");
        let resp_fut = self
            .client
            .post(self.config.url("/api/chat"))
            .json(&chat_req)
            .send();

        async move {
            let resp: ChatResponse = match resp_fut.await {
                Ok(resp) => read_json(resp).await?,
                Err(err) => {
                    error!("ollama chat failed: {err}");
                    return Err(err.into());
                }
            };
            debug!(
                content_len = resp.message.content.len(),
                tool_calls = resp.message.tool_calls.len(),
                "ollama chat response"
            );
            Ok(OllamaResponse::new(proto::create_events(resp)))
        }
    }

    fn health_check(
        &self,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let resp_fut = self.client.get(self.config.url("/api/tags")).send();
        async move {
            resp_fut.await?.error_for_status()?;
            Ok(())
        }
    }
}

/// Embedding provider backed by an Ollama embedding model.
#[derive(Clone, Debug)]
pub struct OllamaEmbedder {
    client: Client,
    config: Arc<OllamaConfig>,
    model: String,
}

impl OllamaEmbedder {
    /// Creates an embedder using `model` on the configured host.
    pub fn new<S: Into<String>>(
        config: OllamaConfig,
        model: S,
    ) -> Result<Self, Error> {
        Ok(Self {
            client: build_client(&config)?,
            config: Arc::new(config),
            model: model.into(),
        })
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, Error> {
        trace!(
            model = %self.model,
            input_len = text.len(),
            "ollama embed request"
        );
        let resp = self
            .client
            .post(self.config.url("/api/embed"))
            .json(&EmbedRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await?;
        let resp: EmbedResponse = read_json(resp).await?;
        let Some(embedding) = resp.embeddings.into_iter().next() else {
            return Err(Error::new(
                "no embedding in response",
                ErrorKind::InvalidResponse,
            ));
        };
        trace!(dimension = embedding.len(), "ollama embed response");
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(
        &self,
        text: &str,
    ) -> Result<Vec<f32>, Box<dyn ModelProviderError>> {
        self.embed_text(text)
            .await
            .map_err(|err| Box::new(err) as Box<dyn ModelProviderError>)
    }
}
