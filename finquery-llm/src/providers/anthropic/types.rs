//! Anthropic messages API wire types

use serde::{Deserialize, Serialize};

use crate::CompletionRequest;

/// Body of `POST /messages`. The system prompt travels top-level, not as a
/// message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub system: String,
    pub messages: [UserTurn; 1],
    pub max_tokens: i32,
    pub temperature: f32,
}

impl MessageRequest {
    pub fn new(model: &str, request: &CompletionRequest) -> Self {
        Self {
            model: model.to_string(),
            system: request.system.clone(),
            messages: [UserTurn {
                role: "user",
                content: request.user.clone(),
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserTurn {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl MessageResponse {
    /// Text blocks joined by newlines. Tool-use and other blocks are dropped.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The model stopped on the token limit, so the text is cut off.
    pub fn truncated(&self) -> bool {
        self.stop_reason.as_deref() == Some("max_tokens")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// `{"type": "error", "error": {"type": ..., "message": ...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    message: String,
}

impl ErrorEnvelope {
    /// `"overloaded_error: Overloaded"`, or just the message when untyped.
    pub fn describe(&self) -> String {
        if self.error.kind.is_empty() {
            self.error.message.clone()
        } else {
            format!("{}: {}", self.error.kind, self.error.message)
        }
    }
}
