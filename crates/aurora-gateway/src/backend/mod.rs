//! AI completion backends and the runtime-swappable provider slot.

mod openai;

pub use openai::OpenAiBackend;

use async_trait::async_trait;
use aurora_kernel::llm::{ChatMessage, CompletionProvider, CompletionRequest, ProviderError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Provider used while no API key is configured; every call fails with
/// [`ProviderError::NotConfigured`].
#[derive(Debug, Default)]
pub struct UnconfiguredProvider;

#[async_trait]
impl CompletionProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured)
    }
}

/// Operator-facing AI provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub base_url: String,
    /// Never serialized back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

impl AiSettings {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Holds the active provider and the settings it was built from; both are
/// replaced together when an admin reconfigures the AI backend.
pub struct ProviderSlot {
    current: RwLock<(AiSettings, Arc<dyn CompletionProvider>)>,
}

impl ProviderSlot {
    /// Build the provider described by `settings`, falling back to
    /// [`UnconfiguredProvider`] if that fails.
    pub fn from_settings(settings: AiSettings) -> Self {
        let provider = build_provider(&settings).unwrap_or_else(|e| {
            warn!(error = %e, "AI provider could not be built; AI features disabled");
            Arc::new(UnconfiguredProvider)
        });
        Self::with_provider(settings, provider)
    }

    pub fn with_provider(settings: AiSettings, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            current: RwLock::new((settings, provider)),
        }
    }

    pub fn provider(&self) -> Arc<dyn CompletionProvider> {
        self.current.read().1.clone()
    }

    pub fn settings(&self) -> AiSettings {
        self.current.read().0.clone()
    }

    /// Rebuild the provider from `settings` and swap it in. In-flight calls
    /// finish on the provider they started with.
    pub fn configure(&self, settings: AiSettings) -> Result<(), ProviderError> {
        let provider = build_provider(&settings)?;
        info!(
            provider = provider.name(),
            model = %settings.model,
            configured = provider.is_configured(),
            "AI provider reconfigured"
        );
        *self.current.write() = (settings, provider);
        Ok(())
    }

    /// Swap in an arbitrary provider, keeping the current settings.
    pub fn replace(&self, provider: Arc<dyn CompletionProvider>) {
        self.current.write().1 = provider;
    }

    /// Completion request carrying the configured temperature and timeout.
    pub fn request(&self, messages: Vec<ChatMessage>) -> CompletionRequest {
        let settings = &self.current.read().0;
        CompletionRequest::new(messages)
            .with_temperature(settings.temperature)
            .with_timeout(Duration::from_secs(settings.timeout_secs.max(1)))
    }
}

fn build_provider(settings: &AiSettings) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
    if !settings.has_api_key() {
        return Ok(Arc::new(UnconfiguredProvider));
    }
    Ok(Arc::new(OpenAiBackend::new(
        &settings.base_url,
        settings.api_key.clone(),
        &settings.model,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_key_means_unconfigured() {
        let slot = ProviderSlot::from_settings(AiSettings::default());
        assert!(!slot.provider().is_configured());
        assert_eq!(slot.provider().name(), "unconfigured");
    }

    #[test]
    fn configure_swaps_provider_and_settings() {
        let slot = ProviderSlot::from_settings(AiSettings::default());
        let settings = AiSettings {
            api_key: Some("sk-test".into()),
            model: "gpt-4o".into(),
            temperature: 0.2,
            timeout_secs: 5,
            ..AiSettings::default()
        };
        slot.configure(settings).unwrap();
        assert!(slot.provider().is_configured());
        assert_eq!(slot.settings().model, "gpt-4o");

        let req = slot.request(vec![ChatMessage::user("hi")]);
        assert_eq!(req.temperature, 0.2);
        assert_eq!(req.timeout, Duration::from_secs(5));
    }

    #[test]
    fn api_key_is_never_serialized() {
        let settings = AiSettings {
            api_key: Some("sk-secret".into()),
            ..AiSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(!json.contains("api_key"));
    }

    #[tokio::test]
    async fn unconfigured_stream_fails_too() {
        let err = UnconfiguredProvider
            .stream(CompletionRequest::new(vec![]))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::NotConfigured));
    }
}
