//! Registry holding the translator and synthesizer the pipeline runs with.

use std::sync::Arc;

use finquery_core::{FinqueryError, FinqueryResult, LlmError};
use tracing::info;

use crate::adapter::{LlmAnswerSynthesizer, LlmQueryTranslator};
use crate::config::{LlmConfig, ProviderKind};
use crate::providers::{
    AnthropicClient, AnthropicCompletionProvider, KeywordTranslator, OpenAIClient,
    OpenAICompletionProvider, TemplateSynthesizer,
};
use crate::{AnswerSynthesizer, CompletionProvider, QueryTranslator};

/// Registry for the two pipeline collaborators.
///
/// # Example
/// ```ignore
/// let registry = ProviderRegistry::from_config(&LlmConfig::from_env()?)?;
/// let query = registry.translator()?.translate(&schema, &tenant, question).await?;
/// ```
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    translator: Option<Arc<dyn QueryTranslator>>,
    synthesizer: Option<Arc<dyn AnswerSynthesizer>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build both collaborators from configuration.
    ///
    /// Hosted providers get one client per role so the translation and
    /// synthesis models can differ.
    pub fn from_config(config: &LlmConfig) -> FinqueryResult<Self> {
        config.validate()?;
        let mut registry = Self::new();

        match config.provider {
            ProviderKind::Offline => {
                registry.register_translator(Arc::new(KeywordTranslator::new()));
                registry.register_synthesizer(Arc::new(TemplateSynthesizer::new()));
            }
            ProviderKind::OpenAI | ProviderKind::Anthropic => {
                let translation = hosted_provider(config, &config.translation_model)?;
                let synthesis = hosted_provider(config, &config.synthesis_model)?;
                registry.register_translator(Arc::new(LlmQueryTranslator::new(translation)));
                registry.register_synthesizer(Arc::new(LlmAnswerSynthesizer::new(synthesis)));
            }
        }

        info!(
            provider = config.provider.as_str(),
            translation_model = %config.translation_model,
            synthesis_model = %config.synthesis_model,
            "LLM providers registered"
        );
        Ok(registry)
    }

    /// Replaces any previously registered translator.
    pub fn register_translator(&mut self, translator: Arc<dyn QueryTranslator>) {
        self.translator = Some(translator);
    }

    /// Replaces any previously registered synthesizer.
    pub fn register_synthesizer(&mut self, synthesizer: Arc<dyn AnswerSynthesizer>) {
        self.synthesizer = Some(synthesizer);
    }

    /// # Errors
    /// `LlmError::ProviderNotConfigured` if no translator is registered.
    pub fn translator(&self) -> FinqueryResult<Arc<dyn QueryTranslator>> {
        self.translator
            .clone()
            .ok_or(FinqueryError::Llm(LlmError::ProviderNotConfigured))
    }

    /// # Errors
    /// `LlmError::ProviderNotConfigured` if no synthesizer is registered.
    pub fn synthesizer(&self) -> FinqueryResult<Arc<dyn AnswerSynthesizer>> {
        self.synthesizer
            .clone()
            .ok_or(FinqueryError::Llm(LlmError::ProviderNotConfigured))
    }

    pub fn has_translator(&self) -> bool {
        self.translator.is_some()
    }

    pub fn has_synthesizer(&self) -> bool {
        self.synthesizer.is_some()
    }
}

fn hosted_provider(config: &LlmConfig, model: &str) -> FinqueryResult<Arc<dyn CompletionProvider>> {
    let api_key = config
        .api_key
        .clone()
        .ok_or(FinqueryError::Llm(LlmError::ProviderNotConfigured))?;
    let rpm = config.requests_per_minute;

    let provider: Arc<dyn CompletionProvider> = match config.provider {
        ProviderKind::OpenAI => {
            let mut client = OpenAIClient::new(api_key, rpm);
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url.as_str());
            }
            Arc::new(OpenAICompletionProvider::new(client, model))
        }
        ProviderKind::Anthropic => {
            let mut client = AnthropicClient::new(api_key, rpm);
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url.as_str());
            }
            Arc::new(AnthropicCompletionProvider::new(client, model))
        }
        ProviderKind::Offline => return Err(FinqueryError::Llm(LlmError::ProviderNotConfigured)),
    };
    Ok(provider)
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("translator", &self.translator.is_some())
            .field("synthesizer", &self.synthesizer.is_some())
            .finish()
    }
}
