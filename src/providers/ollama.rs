use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use super::{GenerateRequest, LlmProvider, ProviderError};

/// Local Ollama provider. Preferred over cloud providers because it is
/// fast, free, and private; requires the model to be pulled locally.
pub struct OllamaProvider {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelTag {
    name: String,
}

impl OllamaProvider {
    pub fn new(base_url: String, model: String, timeout_secs: u64) -> Self {
        // Long timeout: large local models can take minutes per response.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            base_url,
            model,
            client,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<OllamaTagsResponse>().await {
                    Ok(tags) => tags.models.iter().any(|m| m.name == self.model),
                    Err(_) => false,
                }
            }
            Ok(_) => false,
            Err(err) => {
                warn!(error = %err, "Ollama availability check failed");
                false
            }
        }
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let payload = OllamaGenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            temperature: request.temperature,
            top_p: request.top_p,
            stream: false,
        };

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(ProviderError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: OllamaGenerateResponse = response.json().await?;
        Ok(body.response.trim().to_string())
    }
}
