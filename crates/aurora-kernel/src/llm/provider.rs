use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use super::types::{CompletionRequest, ProviderError};

/// Streaming response type: text deltas in arrival order.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Text-completion provider (kernel-owned contract).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// `false` when calls would fail with [`ProviderError::NotConfigured`].
    fn is_configured(&self) -> bool {
        true
    }

    /// Complete once and return the full text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;

    /// Stream the completion as text deltas (default: the whole completion as
    /// a single delta).
    async fn stream(&self, request: CompletionRequest) -> Result<TokenStream, ProviderError> {
        let text = self.complete(request).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }
}
