//! FINQUERY LLM - Translation and Synthesis Collaborators
//!
//! Provider-agnostic traits for the two text-generation steps of the query
//! pipeline, plus HTTP providers for OpenAI and Anthropic and an offline
//! keyword-based provider for development.
//!
//! - [`QueryTranslator`]: question -> [`StructuredQuery`]. Output is
//!   untrusted; callers must isolate and validate it before execution.
//! - [`AnswerSynthesizer`]: retrieved rows -> prose answer.
//!
//! Both are usually backed by a [`CompletionProvider`] through
//! [`LlmQueryTranslator`] and [`LlmAnswerSynthesizer`].

pub mod adapter;
pub mod config;
pub mod parse;
pub mod prompt;
pub mod providers;
pub mod registry;

use async_trait::async_trait;
use finquery_core::{FinqueryResult, Record, StructuredQuery, TenantId};

pub use adapter::{LlmAnswerSynthesizer, LlmQueryTranslator};
pub use config::{LlmConfig, ProviderKind};
pub use parse::{parse_structured_query, strip_code_fences};
pub use registry::ProviderRegistry;

// ============================================================================
// COMPLETION PROVIDER
// ============================================================================

/// A single prompt sent to a chat-completion model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: i32,
    pub temperature: f32,
}

/// Trait for chat-completion providers.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run one completion and return the model's text.
    async fn complete(&self, request: &CompletionRequest) -> FinqueryResult<String>;

    /// Provider name for logs (e.g. "openai").
    fn provider_name(&self) -> &'static str;

    /// Model identifier (e.g. "gpt-4o-mini").
    fn model_id(&self) -> &str;
}

// ============================================================================
// PIPELINE COLLABORATORS
// ============================================================================

/// Turns a natural-language question into a structured query.
#[async_trait]
pub trait QueryTranslator: Send + Sync {
    /// Translate `question` for `tenant_id`, given the rendered schema.
    ///
    /// # Errors
    /// `FinqueryError::Translation` when the output cannot be parsed, or
    /// `FinqueryError::Llm` when the provider call fails.
    async fn translate(
        &self,
        schema: &str,
        tenant_id: &TenantId,
        question: &str,
    ) -> FinqueryResult<StructuredQuery>;
}

/// Turns retrieved rows into a human-readable answer.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        tenant_name: &str,
        question: &str,
        retrieved: &[Record],
    ) -> FinqueryResult<String>;
}
