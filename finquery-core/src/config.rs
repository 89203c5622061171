//! Pipeline configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// Default cache entry lifetime (1 hour).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Longest accepted cache entry lifetime (one year).
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 3600;

/// Default maximum question length in characters.
pub const DEFAULT_MAX_QUESTION_LEN: usize = 500;

/// Settings for one pipeline run: cache lifetime, input limits and the
/// per-call timeouts for each external collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct FinqueryConfig {
    /// Lifetime of a cached answer.
    pub cache_ttl: Duration,
    /// Maximum accepted question length in characters.
    pub max_question_len: usize,
    /// Bound on each cache store call.
    pub cache_timeout: Duration,
    /// Bound on each document store call.
    pub store_timeout: Duration,
    /// Bound on each translation or synthesis call.
    pub llm_timeout: Duration,
}

impl Default for FinqueryConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            max_question_len: DEFAULT_MAX_QUESTION_LEN,
            cache_timeout: Duration::from_secs(2),
            store_timeout: Duration::from_secs(10),
            llm_timeout: Duration::from_secs(30),
        }
    }
}

impl FinqueryConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `FINQUERY_CACHE_TTL_SECS`: cache entry lifetime (default: 3600)
    /// - `FINQUERY_MAX_QUESTION_LEN`: maximum question length (default: 500)
    /// - `FINQUERY_CACHE_TIMEOUT_MS`: cache call bound (default: 2000)
    /// - `FINQUERY_STORE_TIMEOUT_MS`: document store call bound (default: 10000)
    /// - `FINQUERY_LLM_TIMEOUT_MS`: collaborator call bound (default: 30000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            cache_ttl: Duration::from_secs(env_parse(
                "FINQUERY_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            max_question_len: env_parse("FINQUERY_MAX_QUESTION_LEN", defaults.max_question_len)?,
            cache_timeout: Duration::from_millis(env_parse(
                "FINQUERY_CACHE_TIMEOUT_MS",
                defaults.cache_timeout.as_millis() as u64,
            )?),
            store_timeout: Duration::from_millis(env_parse(
                "FINQUERY_STORE_TIMEOUT_MS",
                defaults.store_timeout.as_millis() as u64,
            )?),
            llm_timeout: Duration::from_millis(env_parse(
                "FINQUERY_LLM_TIMEOUT_MS",
                defaults.llm_timeout.as_millis() as u64,
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would disable a safety bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl.is_zero() {
            return Err(invalid("cache_ttl", "0", "must be positive"));
        }
        if self.cache_ttl > Duration::from_secs(MAX_CACHE_TTL_SECS) {
            return Err(invalid(
                "cache_ttl",
                &self.cache_ttl.as_secs().to_string(),
                "must be at most one year",
            ));
        }
        if self.max_question_len == 0 {
            return Err(invalid("max_question_len", "0", "must be positive"));
        }
        for (field, value) in [
            ("cache_timeout", self.cache_timeout),
            ("store_timeout", self.store_timeout),
            ("llm_timeout", self.llm_timeout),
        ] {
            if value.is_zero() {
                return Err(invalid(field, "0", "must be positive"));
            }
        }
        Ok(())
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse an environment variable, falling back to `default` when unset.
/// A set but unparsable value is an error rather than a silent default.
pub fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| invalid(key, &raw, "could not parse")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FinqueryConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.max_question_len, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = FinqueryConfig::default().with_cache_ttl(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "cache_ttl"));
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        let at_cap = FinqueryConfig::default().with_cache_ttl(Duration::from_secs(MAX_CACHE_TTL_SECS));
        assert!(at_cap.validate().is_ok());

        let config = FinqueryConfig::default().with_cache_ttl(Duration::from_secs(u64::MAX));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "cache_ttl"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = FinqueryConfig::default().with_store_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_parse_unset_uses_default() {
        let value: u64 = env_parse("FINQUERY_TEST_SURELY_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
