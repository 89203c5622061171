//! LLM provider implementations
//!
//! Concrete [`CompletionProvider`](crate::CompletionProvider)s for hosted
//! chat-completion APIs, and an offline provider that needs no network.

pub mod anthropic;
pub mod offline;
pub mod openai;
pub mod pacer;

pub use anthropic::{AnthropicClient, AnthropicCompletionProvider};
pub use offline::{KeywordTranslator, TemplateSynthesizer};
pub use openai::{OpenAIClient, OpenAICompletionProvider};
pub use pacer::RequestPacer;

use finquery_core::{FinqueryError, FinqueryResult, LlmError};

pub(crate) fn request_failed(provider: &str, status: i32, message: impl Into<String>) -> FinqueryError {
    FinqueryError::Llm(LlmError::RequestFailed {
        provider: provider.to_string(),
        status,
        message: message.into(),
    })
}

pub(crate) fn rate_limited(provider: &str, retry_after_ms: i64) -> FinqueryError {
    FinqueryError::Llm(LlmError::RateLimited {
        provider: provider.to_string(),
        retry_after_ms,
    })
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> FinqueryError {
    FinqueryError::Llm(LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    })
}

pub(crate) fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<i64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .map(|seconds| (seconds * 1000.0) as i64)
}

/// Decode a provider reply: the JSON body on success, otherwise an
/// [`LlmError`] carrying the status and the provider's error message.
///
/// `error_message` pulls a readable message out of the provider's error
/// body; the raw body is used when it returns `None`.
pub(crate) async fn decode_response<Res: serde::de::DeserializeOwned>(
    provider: &str,
    response: reqwest::Response,
    error_message: impl Fn(&str) -> Option<String>,
) -> FinqueryResult<Res> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| invalid_response(provider, format!("Failed to parse response: {}", e)));
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_ms = parse_retry_after_ms(response.headers()).unwrap_or(0);
        return Err(rate_limited(provider, retry_after_ms));
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or(body);
    Err(request_failed(provider, status.as_u16() as i32, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after_ms(&headers), None);
        headers.insert("retry-after", HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after_ms(&headers), Some(1500));
    }
}
