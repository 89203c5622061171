//! OpenAI completion provider

use async_trait::async_trait;
use finquery_core::FinqueryResult;

use super::client::OpenAIClient;
use super::types::{ChatRequest, ChatResponse};
use crate::providers::invalid_response;
use crate::{CompletionProvider, CompletionRequest};

/// OpenAI completion provider using GPT chat models.
pub struct OpenAICompletionProvider {
    client: OpenAIClient,
    model: String,
}

impl OpenAICompletionProvider {
    /// # Arguments
    /// * `client` - Configured API client
    /// * `model` - Model name (e.g., "gpt-4o-mini", "gpt-4o")
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> FinqueryResult<String> {
        let body = ChatRequest::new(&self.model, request);
        let response: ChatResponse = self.client.request("chat/completions", &body).await?;

        if let Some(usage) = response.usage {
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI completion"
            );
        }

        let choice = response
            .into_first()
            .ok_or_else(|| invalid_response("openai", "No completion in response"))?;
        if choice.truncated() {
            tracing::warn!(model = %self.model, max_tokens = request.max_tokens, "Completion hit the token limit");
        }
        choice
            .message
            .content
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| invalid_response("openai", "No text content in response"))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for OpenAICompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAICompletionProvider")
            .field("model", &self.model)
            .finish()
    }
}
