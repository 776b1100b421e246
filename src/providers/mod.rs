use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub mod mistral;
pub mod ollama;

pub use mistral::MistralProvider;
pub use ollama::OllamaProvider;

/// Request for a text generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 2048,
        }
    }
}

/// Error types for providers
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

/// Main trait that all LLM providers must implement
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get provider name
    fn name(&self) -> &str;

    /// Check whether the provider can serve requests right now.
    async fn is_available(&self) -> bool;

    /// Generate text for a prompt (non-streaming).
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError>;
}

/// Ordered provider chain with fallback: the first provider that yields a
/// non-empty response wins. Local providers go first, cloud last.
pub struct LlmService {
    providers: Vec<Box<dyn LlmProvider>>,
}

impl LlmService {
    pub fn new(providers: Vec<Box<dyn LlmProvider>>) -> Self {
        Self { providers }
    }

    /// Build the default chain from settings: Ollama first, Mistral as the
    /// cloud fallback when an API key is configured.
    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        let mut providers: Vec<Box<dyn LlmProvider>> = vec![Box::new(OllamaProvider::new(
            settings.ollama_base_url.clone(),
            settings.ollama_model.clone(),
            settings.ollama_timeout_secs,
        ))];

        if let Some(api_key) = &settings.mistral_api_key {
            providers.push(Box::new(MistralProvider::new(
                api_key.clone(),
                settings.mistral_model.clone(),
                settings.mistral_timeout_secs,
            )));
        }

        Self::new(providers)
    }

    /// Log which providers answer their availability probe. Purely
    /// informational; generation still tries the full chain.
    pub async fn probe(&self) {
        let mut any = false;
        for provider in &self.providers {
            if provider.is_available().await {
                info!(provider = provider.name(), "LLM provider available");
                any = true;
            }
        }
        if !any {
            warn!("no LLM providers available");
        }
    }

    /// Generate text using available providers with fallback.
    /// Returns the generated text and the name of the provider that served it.
    pub async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<(String, String), ProviderError> {
        let mut last_err = ProviderError::EmptyResponse;

        for provider in &self.providers {
            match provider.generate(request).await {
                Ok(text) if !text.is_empty() => {
                    return Ok((text, provider.name().to_string()));
                }
                Ok(_) => {
                    warn!(provider = provider.name(), "empty response, falling back");
                    last_err = ProviderError::EmptyResponse;
                }
                Err(err) => {
                    warn!(provider = provider.name(), error = %err, "provider failed, falling back");
                    last_err = err;
                }
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticProvider {
        name: &'static str,
        reply: Result<&'static str, ()>,
    }

    #[async_trait]
    impl LlmProvider for StaticProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn is_available(&self) -> bool {
            self.reply.is_ok()
        }

        async fn generate(&self, _request: &GenerateRequest) -> Result<String, ProviderError> {
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(ProviderError::Network("unreachable".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_first_provider_wins() {
        let service = LlmService::new(vec![
            Box::new(StaticProvider { name: "local", reply: Ok("from local") }),
            Box::new(StaticProvider { name: "cloud", reply: Ok("from cloud") }),
        ]);

        let (text, provider) = service
            .generate(&GenerateRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(text, "from local");
        assert_eq!(provider, "local");
    }

    #[tokio::test]
    async fn test_fallback_on_failure() {
        let service = LlmService::new(vec![
            Box::new(StaticProvider { name: "local", reply: Err(()) }),
            Box::new(StaticProvider { name: "cloud", reply: Ok("from cloud") }),
        ]);

        let (text, provider) = service
            .generate(&GenerateRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(text, "from cloud");
        assert_eq!(provider, "cloud");
    }

    #[tokio::test]
    async fn test_fallback_on_empty_response() {
        let service = LlmService::new(vec![
            Box::new(StaticProvider { name: "local", reply: Ok("") }),
            Box::new(StaticProvider { name: "cloud", reply: Ok("from cloud") }),
        ]);

        let (_, provider) = service
            .generate(&GenerateRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(provider, "cloud");
    }

    #[tokio::test]
    async fn test_all_providers_exhausted() {
        let service = LlmService::new(vec![Box::new(StaticProvider {
            name: "local",
            reply: Err(()),
        })]);

        let err = service.generate(&GenerateRequest::new("hi")).await;
        assert!(matches!(err, Err(ProviderError::Network(_))));
    }
}
