//! LLM provider configuration.

use finquery_core::config::env_parse;
use finquery_core::ConfigError;

/// Which backend answers translation and synthesis prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    /// Offline keyword translator and template synthesizer. No API key.
    Offline,
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "offline" | "mock" => Ok(Self::Offline),
            other => Err(ConfigError::ProviderNotSupported {
                provider: other.to_string(),
            }),
        }
    }
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Offline => "offline",
        }
    }

    fn default_translation_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-haiku-20241022",
            ProviderKind::Offline => "keyword",
        }
    }

    fn default_synthesis_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-sonnet-20241022",
            ProviderKind::Offline => "template",
        }
    }
}

/// Provider settings.
#[derive(Clone)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub translation_model: String,
    pub synthesis_model: String,
    /// Client-side request budget per provider client.
    pub requests_per_minute: u32,
    /// Override the provider's API base URL (proxies, test servers).
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let provider = ProviderKind::Offline;
        Self {
            provider,
            api_key: None,
            translation_model: provider.default_translation_model().to_string(),
            synthesis_model: provider.default_synthesis_model().to_string(),
            requests_per_minute: 60,
            base_url: None,
        }
    }
}

impl LlmConfig {
    /// Create LlmConfig from environment variables.
    ///
    /// Environment variables:
    /// - `FINQUERY_LLM_PROVIDER`: `openai`, `anthropic` or `offline` (default: offline)
    /// - `FINQUERY_LLM_API_KEY`: provider API key; falls back to `OPENAI_API_KEY`
    ///   or `ANTHROPIC_API_KEY` for the chosen provider
    /// - `FINQUERY_TRANSLATION_MODEL`, `FINQUERY_SYNTHESIS_MODEL`: model overrides
    /// - `FINQUERY_LLM_RPM`: requests per minute (default: 60)
    /// - `FINQUERY_LLM_BASE_URL`: API base URL override
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider: ProviderKind = env_parse("FINQUERY_LLM_PROVIDER", ProviderKind::Offline)?;

        let vendor_key = match provider {
            ProviderKind::OpenAI => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Offline => None,
        };
        let api_key = std::env::var("FINQUERY_LLM_API_KEY")
            .ok()
            .or_else(|| vendor_key.and_then(|k| std::env::var(k).ok()))
            .filter(|k| !k.trim().is_empty());

        let config = Self {
            provider,
            api_key,
            translation_model: std::env::var("FINQUERY_TRANSLATION_MODEL")
                .unwrap_or_else(|_| provider.default_translation_model().to_string()),
            synthesis_model: std::env::var("FINQUERY_SYNTHESIS_MODEL")
                .unwrap_or_else(|_| provider.default_synthesis_model().to_string()),
            requests_per_minute: env_parse("FINQUERY_LLM_RPM", 60)?,
            base_url: std::env::var("FINQUERY_LLM_BASE_URL").ok(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Hosted providers need an API key and a positive request budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider != ProviderKind::Offline && self.api_key.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "FINQUERY_LLM_API_KEY".to_string(),
                value: String::new(),
                reason: format!("required for provider {}", self.provider.as_str()),
            });
        }
        if self.requests_per_minute == 0 {
            return Err(ConfigError::InvalidValue {
                field: "FINQUERY_LLM_RPM".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Config for a hosted provider with its default models.
    pub fn hosted(provider: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: Some(api_key.into()),
            translation_model: provider.default_translation_model().to_string(),
            synthesis_model: provider.default_synthesis_model().to_string(),
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("translation_model", &self.translation_model)
            .field("synthesis_model", &self.synthesis_model)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAI);
        assert_eq!("mock".parse::<ProviderKind>().unwrap(), ProviderKind::Offline);
        assert!(matches!(
            "cohere".parse::<ProviderKind>(),
            Err(ConfigError::ProviderNotSupported { .. })
        ));
    }

    #[test]
    fn test_hosted_provider_requires_key() {
        let mut config = LlmConfig::hosted(ProviderKind::Anthropic, "sk-test");
        assert!(config.validate().is_ok());
        assert_eq!(config.synthesis_model, "claude-3-5-sonnet-20241022");

        config.api_key = None;
        assert!(config.validate().is_err());
        assert!(LlmConfig::default().validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = LlmConfig::hosted(ProviderKind::OpenAI, "sk-secret");
        let shown = format!("{:?}", config);
        assert!(!shown.contains("sk-secret"));
        assert!(shown.contains("[REDACTED]"));
    }
}
