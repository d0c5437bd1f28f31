use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// An error raised by a model or embedding provider.
///
/// The [`ErrorKind`] tells callers whether retrying may help.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Classifies this error.
    fn kind(&self) -> ErrorKind;
}

/// A chat model service.
///
/// A provider is cheap to share and holds no conversation state: every
/// request carries the full history. Futures it returns must not borrow
/// the provider, so they can outlive it.
pub trait ModelProvider: Send + Sync {
    /// The error type of this provider.
    type Error: ModelProviderError;

    /// The reply type of this provider.
    type Response: ModelResponse<Error = Self::Error>;

    /// Sends a chat request.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;

    /// Checks whether the model service is reachable.
    ///
    /// The default implementation always succeeds, which suits providers
    /// without a remote service.
    fn health_check(
        &self,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        std::future::ready(Ok(()))
    }
}
