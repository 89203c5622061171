//! Pipeline collaborators backed by a completion provider.

use std::sync::Arc;

use async_trait::async_trait;
use finquery_core::{FinqueryResult, Record, StructuredQuery, TenantId};
use tracing::{debug, warn};

use crate::parse::parse_structured_query;
use crate::prompt::{synthesis_request, translation_request};
use crate::{AnswerSynthesizer, CompletionProvider, QueryTranslator};

/// [`QueryTranslator`] that prompts a completion model and parses its reply.
pub struct LlmQueryTranslator {
    provider: Arc<dyn CompletionProvider>,
}

impl LlmQueryTranslator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl QueryTranslator for LlmQueryTranslator {
    async fn translate(
        &self,
        schema: &str,
        tenant_id: &TenantId,
        question: &str,
    ) -> FinqueryResult<StructuredQuery> {
        let request = translation_request(schema, tenant_id, question);
        let raw = self.provider.complete(&request).await?;

        match parse_structured_query(&raw) {
            Ok(query) => {
                debug!(
                    provider = self.provider.provider_name(),
                    collection = %query.collection,
                    operation = %query.operation,
                    "Translated question"
                );
                Ok(query)
            }
            Err(e) => {
                warn!(
                    provider = self.provider.provider_name(),
                    model = self.provider.model_id(),
                    error = %e,
                    raw_output = %raw,
                    "Translator returned unparsable output"
                );
                Err(e.into())
            }
        }
    }
}

impl std::fmt::Debug for LlmQueryTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmQueryTranslator")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model_id())
            .finish()
    }
}

/// [`AnswerSynthesizer`] that prompts a completion model.
pub struct LlmAnswerSynthesizer {
    provider: Arc<dyn CompletionProvider>,
}

impl LlmAnswerSynthesizer {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl AnswerSynthesizer for LlmAnswerSynthesizer {
    async fn synthesize(
        &self,
        tenant_name: &str,
        question: &str,
        retrieved: &[Record],
    ) -> FinqueryResult<String> {
        let request = synthesis_request(tenant_name, question, retrieved);
        let answer = self.provider.complete(&request).await?;
        Ok(answer.trim().to_string())
    }
}

impl std::fmt::Debug for LlmAnswerSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmAnswerSynthesizer")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model_id())
            .finish()
    }
}
