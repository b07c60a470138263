use coach_genai::LanguageModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoachError {
    /// The AI service could not be set up, e.g. the API key is empty or was
    /// rejected by the provider.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The request to the model failed in transport or was refused.
    #[error("{0}")]
    Request(#[source] LanguageModelError),
    /// The model answered, but not in the required shape.
    #[error("Format error: {0}")]
    Format(String),
    /// The operation is not allowed in the current conversation state. Nothing
    /// was changed.
    #[error("Operation rejected: {0}")]
    Precondition(#[from] Precondition),
    #[error("Storage error: {0}")]
    Storage(String),
    /// A new conversation was started while the request was in flight. Its
    /// result was discarded.
    #[error("The conversation was reset before the request completed")]
    Superseded,
}

impl From<LanguageModelError> for CoachError {
    fn from(error: LanguageModelError) -> Self {
        if error.is_auth_error() {
            Self::Initialization(error.to_string())
        } else {
            Self::Request(error)
        }
    }
}

impl From<serde_json::Error> for CoachError {
    fn from(error: serde_json::Error) -> Self {
        Self::Format(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("input is empty")]
    EmptyInput,
    #[error("another request is already in progress")]
    Busy,
    #[error("no conversation has been started")]
    NoSession,
    #[error("no message at index {0}")]
    NoSuchMessage(usize),
    #[error("message {0} does not hold an analysis")]
    NotAnAnalysis(usize),
    #[error("message {0} is already being translated")]
    AlreadyTranslating(usize),
    #[error("no API key has been configured")]
    NotConfigured,
}

pub type CoachResult<T> = Result<T, CoachError>;
