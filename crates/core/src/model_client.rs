use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use relay_agent_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent, ToolCallRequest,
};
use tracing::Instrument;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn = Arc<dyn Fn(&ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;
type BoxedHealthCheckFuture =
    Pin<Box<dyn Future<Output = Result<(), Box<dyn ModelProviderError>>> + Send>>;
type HealthCheckFn = Arc<dyn Fn() -> BoxedHealthCheckFuture + Send + Sync>;

const INITIAL_RETRY_INTERVAL: Duration = Duration::from_millis(500);
const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// A wrapper around a model provider that retries transient failures
/// and provides a type-erased interface for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    health_check_fn: HealthCheckFn,
    max_retries: u32,
}

impl ModelClient {
    /// Wraps a model provider.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let provider = Arc::new(provider);
        let health_check_fn: HealthCheckFn = {
            let provider = Arc::clone(&provider);
            Arc::new(move || {
                let fut = provider.health_check();
                Box::pin(async move {
                    fut.await.map_err(|err| {
                        Box::new(err) as Box<dyn ModelProviderError>
                    })
                })
            })
        };
        let handler_fn: HandlerFn = Arc::new(move |req| {
            trace!("got a request: {:?}", req);
            let fut = provider.send_request(req);
            Box::pin(
                async move {
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            health_check_fn,
            max_retries: 3,
        }
    }

    /// Sets how many times a request failing with a transient error is
    /// retried.
    #[inline]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sends a request and returns the response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    pub async fn send_request(&self, req: &ModelRequest) -> SendRequestResult {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(INITIAL_RETRY_INTERVAL)
            .with_max_interval(MAX_RETRY_INTERVAL)
            .with_max_elapsed_time(None)
            .build();
        let max_retries = self.max_retries;
        let mut attempt = 0;
        backoff::future::retry(policy, || {
            attempt += 1;
            let attempt = attempt;
            let fut = (self.handler_fn)(req);
            async move {
                fut.await.map_err(|err| {
                    if err.kind().is_transient() && attempt <= max_retries {
                        warn!("model request failed (attempt {attempt}): {err}");
                        backoff::Error::transient(err)
                    } else {
                        error!("model request failed: {err}");
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .await
    }

    /// Checks whether the model service is reachable.
    #[inline]
    pub async fn health_check(
        &self,
    ) -> Result<(), Box<dyn ModelProviderError>> {
        (self.health_check_fn)().await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// The text of the reply.
    pub content: String,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            debug!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                debug!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                content.push_str(&msg);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        content,
        tool_calls,
        finish_reason,
    })
}
