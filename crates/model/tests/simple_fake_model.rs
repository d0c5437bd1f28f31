use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future;
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use async_trait::async_trait;
use relay_agent_model::{
    EmbeddingProvider, ErrorKind, ModelFinishReason, ModelMessage,
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent, ModelResponseExt, ToolCallRequest,
};
use serde_json::json;
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

#[derive(Debug)]
struct FakeModelResponse {
    fake_events: VecDeque<ModelResponseEvent>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl FakeModelResponse {
    fn new(input: &str) -> Self {
        let mut fake_events: VecDeque<_> = format!("You said {input}")
            .split(' ')
            .map(|word| ModelResponseEvent::MessageDelta(format!("{word} ")))
            .collect();
        let finish_reason = if input.contains("time") {
            fake_events.push_back(ModelResponseEvent::ToolCall(
                ToolCallRequest {
                    id: "call_0".to_owned(),
                    name: "clock".to_owned(),
                    arguments: json!({}),
                },
            ));
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        };
        fake_events.push_back(ModelResponseEvent::Completed(finish_reason));
        Self {
            fake_events,
            sleep: None,
        }
    }
}

impl ModelResponse for FakeModelResponse {
    type Error = FakeModelProviderError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;
            return Poll::Ready(Ok(this.fake_events.pop_front()));
        }
        this.sleep = Some(Box::pin(sleep(Duration::from_millis(1))));
        Pin::new(this).poll_next_event(cx)
    }
}

struct FakeModelProvider;

impl ModelProvider for FakeModelProvider {
    type Error = FakeModelProviderError;
    type Response = FakeModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result = match req.messages.last() {
            Some(ModelMessage::User(text)) => Ok(FakeModelResponse::new(text)),
            _ => Err(FakeModelProviderError(ErrorKind::Other)),
        };
        future::ready(result)
    }
}

struct LengthEmbedder;

#[async_trait]
impl EmbeddingProvider for LengthEmbedder {
    async fn embed(
        &self,
        text: &str,
    ) -> Result<Vec<f32>, Box<dyn ModelProviderError>> {
        if text.is_empty() {
            return Err(Box::new(FakeModelProviderError(
                ErrorKind::InvalidResponse,
            )));
        }
        Ok(vec![text.chars().count() as f32, 1.0])
    }
}

async fn collect(
    mut resp: FakeModelResponse,
) -> (String, Vec<ToolCallRequest>, Option<ModelFinishReason>) {
    let mut text = String::new();
    let mut tool_calls = vec![];
    let mut finish_reason = None;
    loop {
        let event = resp.next_event().await.unwrap();
        match event {
            Some(ModelResponseEvent::MessageDelta(delta)) => {
                text.push_str(&delta);
            }
            Some(ModelResponseEvent::ToolCall(req)) => tool_calls.push(req),
            Some(ModelResponseEvent::Completed(reason)) => {
                finish_reason = Some(reason);
            }
            None => break,
        }
    }
    (text, tool_calls, finish_reason)
}

#[tokio::test]
async fn test_completion() {
    let provider = FakeModelProvider;
    let req = ModelRequest {
        messages: vec![ModelMessage::User("Good morning".to_owned())],
        ..Default::default()
    };
    let resp = provider.send_request(&req).await.unwrap();
    let (text, tool_calls, finish_reason) = collect(resp).await;

    assert_eq!(text.trim_end(), "You said Good morning");
    assert!(tool_calls.is_empty());
    assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_tool_call_events() {
    let provider = FakeModelProvider;
    let req = ModelRequest {
        messages: vec![ModelMessage::User("What time is it".to_owned())],
        ..Default::default()
    };
    let resp = provider.send_request(&req).await.unwrap();
    let (_, tool_calls, finish_reason) = collect(resp).await;

    assert_eq!(tool_calls.len(), 1);
    assert_eq!(tool_calls[0].name, "clock");
    assert_eq!(finish_reason, Some(ModelFinishReason::ToolCalls));
}

#[tokio::test]
async fn test_error() {
    let provider = FakeModelProvider;
    let result = provider.send_request(&ModelRequest::default()).await;
    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
}

#[tokio::test]
async fn test_default_health_check() {
    assert!(FakeModelProvider.health_check().await.is_ok());
}

#[tokio::test]
async fn test_embedding_provider_object() {
    let embedder: Box<dyn EmbeddingProvider> = Box::new(LengthEmbedder);
    assert_eq!(embedder.embed("abc").await.unwrap(), vec![3.0, 1.0]);
    let err = embedder.embed("").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidResponse);
}
