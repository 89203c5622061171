//! Anthropic (Claude) completion provider

use async_trait::async_trait;
use finquery_core::FinqueryResult;

use super::client::AnthropicClient;
use super::types::{MessageRequest, MessageResponse};
use crate::providers::invalid_response;
use crate::{CompletionProvider, CompletionRequest};

const PROVIDER: &str = "anthropic";

/// Anthropic completion provider using Claude models.
pub struct AnthropicCompletionProvider {
    client: AnthropicClient,
    model: String,
}

impl AnthropicCompletionProvider {
    /// # Arguments
    /// * `client` - Configured API client
    /// * `model` - Model name (e.g., "claude-3-5-sonnet-20241022")
    pub fn new(client: AnthropicClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> FinqueryResult<String> {
        let body = MessageRequest::new(&self.model, request);
        let response: MessageResponse = self.client.request("messages", &body).await?;

        if let Some(usage) = response.usage {
            tracing::debug!(
                model = %self.model,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Anthropic completion"
            );
        }
        if response.truncated() {
            tracing::warn!(model = %self.model, max_tokens = request.max_tokens, "Completion hit the token limit");
        }

        let text = response.text();
        if text.trim().is_empty() {
            return Err(invalid_response(PROVIDER, "No text content in response"));
        }
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for AnthropicCompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicCompletionProvider")
            .field("model", &self.model)
            .finish()
    }
}
