use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::shared::error::{AppError, AppResult, BackendError};
use crate::shared::settings::BackendSettings;
use crate::shared::types::Language;

/// Text-generation backend the orchestrator sends prompts to
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Run `prompt` and return the raw model output
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Prompt asking the model for the bare translation of `text`
pub fn build_prompt(text: &str, language: &Language) -> String {
    format!(
        "Translate the following text to {}. Provide ONLY the translation with no additional text or explanation: {}",
        language.display_name, text
    )
}

// -- Ollama /api/generate wire format --

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Parse a non-streaming generate body; any other field is ignored
pub fn parse_generate_response(body: &str) -> Result<String, BackendError> {
    serde_json::from_str::<GenerateResponse>(body)
        .map(|parsed| parsed.response)
        .map_err(|e| BackendError::Malformed(e.to_string()))
}

fn is_loopback(endpoint: &str) -> bool {
    match reqwest::Url::parse(endpoint) {
        Ok(url) => matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]")),
        Err(_) => false,
    }
}

/// Ollama-compatible HTTP backend
pub struct OllamaBackend {
    http: Client,
    endpoint: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(settings: &BackendSettings) -> AppResult<Self> {
        let mut builder = Client::builder().user_agent("clip-translate/translator");
        // A local model server is never reached through a proxy
        if is_loopback(&settings.endpoint) {
            builder = builder.no_proxy();
        }
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(|e| AppError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TranslationBackend for OllamaBackend {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let payload = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        tracing::debug!("[OllamaBackend] Sending request to {} ({})", self.endpoint, self.model);
        let res = self.http.post(&self.endpoint).json(&payload).send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::warn!("[OllamaBackend] API request failed: {}", status);
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = res.text().await?;
        parse_generate_response(&body)
    }
}
