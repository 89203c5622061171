//! Error types for FINQUERY operations

use thiserror::Error;

/// Input validation errors. These are the only errors whose message is
/// shown to the caller verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error("Question is too long ({len} characters). Please keep it under {max} characters")]
    QuestionTooLong { len: usize, max: usize },

    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },
}

/// LLM provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("No LLM provider configured")]
    ProviderNotConfigured,

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: i32,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: i64,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Failures turning a question into a structured query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslationError {
    /// The collaborator answered, but not with a parsable structured query.
    /// `raw` keeps the original text for diagnosis.
    #[error("Could not parse structured query: {reason}")]
    ParseError { reason: String, raw: String },
}

/// Out-of-contract queries and document store failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid collection: {collection}")]
    InvalidCollection { collection: String },

    #[error("Unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },

    #[error("Query execution failed: {reason}")]
    ExecutionFailed { reason: String },
}

/// Cache store errors. Swallowed by the response cache; never surfaced to
/// callers of the pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Cache operation timed out")]
    Timeout,

    /// The expiry computed from `ttl_secs` is not representable.
    #[error("Cache TTL out of range: {ttl_secs}s")]
    InvalidTtl { ttl_secs: u64 },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Provider not supported: {provider}")]
    ProviderNotSupported { provider: String },
}

/// Master error type for all FINQUERY errors.
#[derive(Debug, Clone, Error)]
pub enum FinqueryError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Stage {stage} timed out after {elapsed_ms}ms")]
    Timeout { stage: String, elapsed_ms: u64 },
}

impl FinqueryError {
    /// Whether the caller can fix this by changing their input.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, FinqueryError::Validation(_))
    }

    /// Build a timeout error for a named pipeline stage.
    pub fn timeout(stage: impl Into<String>, elapsed: std::time::Duration) -> Self {
        FinqueryError::Timeout {
            stage: stage.into(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Result type alias for FINQUERY operations.
pub type FinqueryResult<T> = Result<T, FinqueryError>;

// =============================================================================
// TESTS
// =============================================================================
