//! Anthropic Messages API client

use async_trait::async_trait;
use charla_core::config::ProviderConfig;
use charla_core::utils::truncate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::base::{
    CompletionProvider, CompletionRequest, CompletionResponse, ProviderError, ProviderResult,
};

/// Values shipped in sample env files that must never reach the endpoint
const PLACEHOLDER_KEYS: &[&str] = &[
    "tu_api_key_aqui",
    "your_api_key_here",
    "your-api-key",
    "sk-ant-...",
    "changeme",
];

/// Error envelope returned on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Anthropic provider client
pub struct AnthropicClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    anthropic_version: String,
}

impl AnthropicClient {
    /// Create a new Anthropic client
    pub fn new(api_key: Option<String>, api_base: Option<String>) -> Self {
        let api_base = api_base
            .filter(|base| !base.trim().is_empty())
            .unwrap_or_else(|| "https://api.anthropic.com".to_string());

        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            anthropic_version: "2023-06-01".to_string(),
        }
    }

    /// Build a client from the `provider` config section
    pub fn from_config(config: &ProviderConfig) -> Self {
        let api_key = Some(config.api_key.clone()).filter(|key| !key.trim().is_empty());
        let mut client = Self::new(api_key, Some(config.api_base.clone()));
        client.anthropic_version = config.anthropic_version.clone();
        client
    }

    /// Whether a usable key is configured
    pub fn is_configured(&self) -> bool {
        self.checked_key().is_ok()
    }

    fn checked_key(&self) -> ProviderResult<&str> {
        let key = self.api_key.as_deref().map(str::trim).unwrap_or_default();
        if key.is_empty() {
            return Err(ProviderError::ConfigError(
                "Anthropic API key is not configured. Set ANTHROPIC_API_KEY or provider.api_key in config.json".to_string(),
            ));
        }
        if PLACEHOLDER_KEYS.iter().any(|p| key.eq_ignore_ascii_case(p)) {
            return Err(ProviderError::ConfigError(
                "Anthropic API key is still the placeholder value. Replace it with a real key"
                    .to_string(),
            ));
        }
        Ok(key)
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.api_base)
    }

    fn api_error(status: u16, body: &str) -> ProviderError {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| truncate(body.trim(), 200));
        ProviderError::ApiError { status, message }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> ProviderResult<CompletionResponse> {
        let api_key = self.checked_key()?;
        let url = self.endpoint();

        info!(
            "Anthropic request to {} model={} turns={}",
            url,
            request.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.anthropic_version)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                "Anthropic error {}: {}",
                status.as_u16(),
                truncate(&body, 500)
            );
            return Err(Self::api_error(status.as_u16(), &body));
        }

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("response body is not JSON: {}", e))
        })?;
        let parsed = CompletionResponse::from_value(&value);
        debug!(
            "Anthropic response: {} blocks, stop_reason={:?}",
            parsed.content.len(),
            parsed.stop_reason
        );
        Ok(parsed)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
