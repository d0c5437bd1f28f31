use std::future::poll_fn;
use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider::ModelProviderError;

/// A reply of the model, consumed as a stream of events.
///
/// Services that answer in one piece replay the reply as a short event
/// sequence: the text, then the tool calls, then [`Completed`].
///
/// [`Completed`]: ModelResponseEvent::Completed
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Polls for the next event of the reply.
    ///
    /// `Ok(None)` marks the end of the reply and is returned again on any
    /// later call. `Pending` schedules a wakeup through `cx` once more
    /// events may be available.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// Async helpers for [`ModelResponse`].
pub trait ModelResponseExt: ModelResponse + Unpin {
    /// Waits for the next event of the reply.
    fn next_event(
        &mut self,
    ) -> impl Future<Output = Result<Option<ModelResponseEvent>, Self::Error>>
    + Send
    + '_ {
        poll_fn(move |cx| Pin::new(&mut *self).poll_next_event(cx))
    }
}

impl<R: ModelResponse + Unpin> ModelResponseExt for R {}

/// Why the model stopped generating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The reply asks for tool calls.
    ToolCalls,
    /// The reply is a final answer.
    Stop,
}

impl ModelFinishReason {
    /// Returns the reason matching a reply with or without tool calls.
    #[inline]
    pub fn of(has_tool_calls: bool) -> Self {
        if has_tool_calls {
            Self::ToolCalls
        } else {
            Self::Stop
        }
    }
}

/// A tool call requested by the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Identifier of the call, echoed back with its result.
    pub id: String,
    /// Name of the requested tool.
    pub name: String,
    /// Arguments for the tool, normally a JSON object.
    pub arguments: Value,
}

impl ToolCallRequest {
    /// Creates a tool call request.
    #[inline]
    pub fn new<S1, S2>(id: S1, name: S2, arguments: Value) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// An event of a [`ModelResponse`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// The reply is over.
    Completed(ModelFinishReason),
    /// A piece of the reply text.
    MessageDelta(String),
    /// A tool call.
    ToolCall(ToolCallRequest),
}
