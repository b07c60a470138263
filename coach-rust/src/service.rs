use crate::{
    code_block::strip_json_fence,
    errors::{CoachError, CoachResult},
    prompts,
    types::{StructuredAnalysis, TranslatedCode},
};
use coach_genai::{
    google::{GoogleModel, GoogleModelOptions},
    ChatConfig, ChatSession, ChatStream, LanguageModel, TracedModel,
};
use std::sync::Arc;

pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Default)]
pub struct AiServiceOptions {
    /// Defaults to `gemini-2.5-flash`.
    pub model_id: Option<String>,
    /// Overrides the Gemini REST endpoint.
    pub base_url: Option<String>,
}

/// Talks to the coaching model. Every conversation gets its own
/// [`ChatSession`] created with the coach system instruction.
#[derive(Clone)]
pub struct AiService {
    model: Arc<dyn LanguageModel>,
}

impl AiService {
    /// Builds a service backed by Gemini. The key is only checked for
    /// presence here; the provider validates it on the first request.
    pub fn initialize(api_key: &str, options: AiServiceOptions) -> CoachResult<Self> {
        if api_key.trim().is_empty() {
            return Err(CoachError::Initialization(
                "API key is required to initialize the AI service.".to_string(),
            ));
        }

        let model_id = options
            .model_id
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());
        let model = TracedModel::new(GoogleModel::new(
            model_id,
            GoogleModelOptions {
                api_key: api_key.to_string(),
                base_url: options.base_url,
                ..Default::default()
            },
        ));

        tracing::debug!(model_id = %model.model_id(), "AI service initialized");
        Ok(Self::from_model(Arc::new(model)))
    }

    #[must_use]
    pub fn from_model(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    #[must_use]
    pub fn create_chat(&self) -> ChatSession {
        ChatSession::new(
            self.model.clone(),
            ChatConfig {
                system_prompt: Some(prompts::SYSTEM_INSTRUCTION.to_string()),
                ..ChatConfig::default()
            },
        )
    }

    /// Requests the structured analysis of a problem. The fragments
    /// concatenate to a JSON document, see [`parse_analysis`].
    pub async fn stream_analysis(
        &self,
        chat: &ChatSession,
        problem: &str,
        language: &str,
    ) -> CoachResult<ChatStream> {
        let stream = chat
            .send_message_stream(
                prompts::analysis_prompt(problem, language),
                Some(prompts::analysis_format()),
            )
            .await?;
        Ok(stream)
    }

    /// Sends a follow-up whose Markdown answer is streamed back.
    pub async fn stream_follow_up(
        &self,
        chat: &ChatSession,
        message: &str,
        language: &str,
    ) -> CoachResult<ChatStream> {
        let stream = chat
            .send_message_stream(prompts::follow_up_prompt(message, language), None)
            .await?;
        Ok(stream)
    }

    /// Asks for the solution in another language and returns the new
    /// Markdown code block.
    pub async fn code_in_language(
        &self,
        chat: &ChatSession,
        problem: &str,
        algorithm: &str,
        language: &str,
    ) -> CoachResult<String> {
        let text = chat
            .send_message(
                prompts::translation_prompt(problem, algorithm, language),
                Some(prompts::code_only_format()),
            )
            .await?;
        let translated: TranslatedCode = serde_json::from_str(strip_json_fence(&text))?;
        Ok(translated.code)
    }
}

/// Parses the accumulated analysis reply, tolerating a Markdown JSON fence.
pub fn parse_analysis(text: &str) -> CoachResult<StructuredAnalysis> {
    let analysis = serde_json::from_str(strip_json_fence(text))?;
    Ok(analysis)
}
