use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// The fixed-shape first answer of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredAnalysis {
    /// Progressively more revealing hints, three by contract.
    pub hints: Vec<String>,
    /// Step-by-step approach, in Markdown.
    pub algorithm: String,
    /// Full solution as a fenced Markdown code block.
    pub code: String,
}

/// Shape of a translation reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedCode {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MessageContent {
    Text(String),
    Analysis(StructuredAnalysis),
}

impl MessageContent {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Analysis(_) => None,
        }
    }

    #[must_use]
    pub fn as_analysis(&self) -> Option<&StructuredAnalysis> {
        match self {
            Self::Analysis(analysis) => Some(analysis),
            Self::Text(_) => None,
        }
    }
}

/// Identifies a message within one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: MessageContent,
    /// Set while the code of this message is being translated.
    pub is_updating: bool,
    pub updating_to_language: Option<String>,
}

impl Message {
    pub(crate) fn new(id: MessageId, role: Role, content: MessageContent) -> Self {
        Self {
            id,
            role,
            content,
            is_updating: false,
            updating_to_language: None,
        }
    }

    #[must_use]
    pub fn is_model(&self) -> bool {
        self.role == Role::Model
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationPhase {
    Empty,
    AwaitingInitialAnalysis,
    Active,
}

/// A point-in-time copy of the conversation for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub phase: ConversationPhase,
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub locked_problem_statement: String,
    pub draft: String,
    pub preferred_language: String,
    pub has_session: bool,
}

impl ConversationSnapshot {
    /// Whether a UI should refuse new submissions.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.is_loading || self.messages.iter().any(|message| message.is_updating)
    }
}
