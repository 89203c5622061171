//! OpenAI HTTP client with rate limiting

use finquery_core::FinqueryResult;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use super::types::ErrorEnvelope;
use crate::providers::pacer::RequestPacer;
use crate::providers::{decode_response, request_failed};

const PROVIDER: &str = "openai";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI API client with rate limiting.
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    pacer: RequestPacer,
}

impl OpenAIClient {
    /// Create a new OpenAI client.
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `requests_per_minute` - Maximum requests per minute
    pub fn new(api_key: impl Into<String>, requests_per_minute: u32) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            pacer: RequestPacer::new(requests_per_minute),
        }
    }

    /// Point the client at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
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
            .bearer_auth(&self.api_key)
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

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_override_trims_slash() {
        let client = OpenAIClient::new("sk-test", 60).with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
        assert!(!format!("{:?}", client).contains("sk-test"));
    }
}
