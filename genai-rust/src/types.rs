use serde_json::Value;
use std::ops::AddAssign;

/// The author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// One text-only turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Shape the reply must take. `Json` carries the JSON Schema the reply is
/// constrained to.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    Text,
    Json(Value),
}

/// Everything a model needs for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRequest {
    pub system_prompt: Option<String>,
    /// Prior turns followed by the new user turn.
    pub messages: Vec<Message>,
    pub response_format: Option<ResponseFormat>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// One increment of a streamed reply. A chunk that only reports usage has
/// empty `text`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseChunk {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl ResponseChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}
