//! Anthropic HTTP client with rate limiting

use finquery_core::FinqueryResult;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use super::types::ErrorEnvelope;
use crate::providers::pacer::RequestPacer;
use crate::providers::{decode_response, request_failed};

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API client with rate limiting.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    pacer: RequestPacer,
}

impl AnthropicClient {
    /// Create a new Anthropic client.
    ///
    /// # Arguments
    /// * `api_key` - Anthropic API key
    /// * `requests_per_minute` - Maximum requests per minute
    pub fn new(api_key: impl Into<String>, requests_per_minute: u32) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            pacer: RequestPacer::new(requests_per_minute),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Make an API request with automatic rate limiting.
    pub async fn request<Req: Serialize, Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Req,
    ) -> FinqueryResult<Res> {
        let _permit = self.pacer.acquire(PROVIDER).await?;

        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| request_failed(PROVIDER, 0, format!("HTTP request failed: {}", e)))?;

        decode_response(PROVIDER, response, |body| {
            serde_json::from_str::<ErrorEnvelope>(body)
                .ok()
                .map(|envelope| envelope.describe())
        })
        .await
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
