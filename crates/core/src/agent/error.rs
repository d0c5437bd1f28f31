use relay_agent_model::ModelProviderError;
use relay_agent_retrieval::RetrievalError;

/// Errors returned by [`Agent`](super::Agent) operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The model service failed, after retries if the failure was
    /// transient.
    #[error("model request failed: {0}")]
    Model(Box<dyn ModelProviderError>),

    /// The model service did not pass the startup health check.
    #[error("model service is unavailable: {0}")]
    Unhealthy(Box<dyn ModelProviderError>),

    /// The model kept requesting tools for too many rounds.
    #[error("max iterations reached ({0})")]
    MaxIterations(usize),

    /// A retrieval operation was requested without a retrieval engine.
    #[error("retrieval is not enabled")]
    RetrievalDisabled,

    /// The retrieval engine failed.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}
