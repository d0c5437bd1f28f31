use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use relay_agent_model::{ModelResponse, ModelResponseEvent};

/// A response to a non-streaming chat request.
///
/// The whole reply has arrived by the time this is created, events are
/// handed out immediately.
pub struct OllamaResponse {
    events: VecDeque<ModelResponseEvent>,
}

impl OllamaResponse {
    #[inline]
    pub(crate) fn new(events: Vec<ModelResponseEvent>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

impl ModelResponse for OllamaResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        Poll::Ready(Ok(self.get_mut().events.pop_front()))
    }
}
