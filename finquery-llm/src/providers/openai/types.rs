//! OpenAI chat-completions wire types

use serde::{Deserialize, Serialize};

use crate::CompletionRequest;

/// Body of `POST /chat/completions`: one system turn and one user turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: [ChatTurn; 2],
    pub max_tokens: i32,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(model: &str, request: &CompletionRequest) -> Self {
        Self {
            model: model.to_string(),
            messages: [
                ChatTurn {
                    role: "system",
                    content: request.system.clone(),
                },
                ChatTurn {
                    role: "user",
                    content: request.user.clone(),
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantMessage {
    /// Null when the model answered with a tool call instead of text.
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl ChatResponse {
    /// The first choice, which is the only one requested.
    pub fn into_first(self) -> Option<Choice> {
        self.choices.into_iter().next()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: AssistantMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl Choice {
    /// The model stopped on the token limit, so the text is cut off.
    pub fn truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// `{"error": {"message": ..., "code": ...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

impl ErrorEnvelope {
    /// `"invalid_api_key: Incorrect API key provided"`, or just the message.
    pub fn describe(&self) -> String {
        match &self.error.code {
            Some(code) => format!("{}: {}", code, self.error.message),
            None => self.error.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_deserializes_without_usage() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(response.usage.is_none());
        let choice = response.into_first().unwrap();
        assert_eq!(choice.message.content.as_deref(), Some("hi"));
        assert!(!choice.truncated());
    }

    #[test]
    fn test_null_content_is_none() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":null},"finish_reason":"tool_calls"}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(response.into_first().unwrap().message.content.is_none());
    }

    #[test]
    fn test_error_envelope_with_and_without_code() {
        let coded: ErrorEnvelope = serde_json::from_str(
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#,
        )
        .unwrap();
        assert_eq!(coded.describe(), "invalid_api_key: Incorrect API key provided");

        let plain: ErrorEnvelope =
            serde_json::from_str(r#"{"error":{"message":"Bad gateway","code":null}}"#).unwrap();
        assert_eq!(plain.describe(), "Bad gateway");
    }
}
