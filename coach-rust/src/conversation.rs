use crate::{
    config::DEFAULT_LANGUAGE,
    errors::{CoachError, CoachResult, Precondition},
    service::{parse_analysis, AiService},
    types::{
        ConversationPhase, ConversationSnapshot, Message, MessageContent, MessageId, Role,
        StructuredAnalysis,
    },
};
use coach_genai::ChatSession;
use futures::{lock::Mutex, StreamExt};
use std::sync::Arc;
use tracing::{info_span, Instrument};

/// The coaching conversation: an ordered transcript, the chat session behind
/// it and the loading/error flags a UI renders.
///
/// Cloning is cheap and clones share the same state, so a UI can render a
/// [`ConversationSnapshot`] while an operation is in flight. The state lock
/// is never held across a model call.
#[derive(Clone)]
pub struct Conversation {
    service: AiService,
    state: Arc<Mutex<ConversationState>>,
}

struct ConversationState {
    /// Advanced whenever the transcript is replaced. Operations started under
    /// an older generation do not write back.
    generation: u64,
    next_message_id: u64,
    messages: Vec<Message>,
    session: Option<ChatSession>,
    is_loading: bool,
    error: Option<String>,
    locked_problem_statement: String,
    draft: String,
    preferred_language: String,
}

impl ConversationState {
    fn push_message(&mut self, role: Role, content: MessageContent) -> MessageId {
        let id = MessageId(self.next_message_id);
        self.next_message_id += 1;
        self.messages.push(Message::new(id, role, content));
        id
    }

    fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|message| message.id == id)
    }

    fn phase(&self) -> ConversationPhase {
        if self.messages.is_empty() {
            ConversationPhase::Empty
        } else if self.is_loading && self.messages.len() == 1 {
            ConversationPhase::AwaitingInitialAnalysis
        } else {
            ConversationPhase::Active
        }
    }

    fn is_busy(&self) -> bool {
        self.is_loading || self.messages.iter().any(|message| message.is_updating)
    }
}

impl Conversation {
    #[must_use]
    pub fn new(service: AiService) -> Self {
        Self::with_language(service, DEFAULT_LANGUAGE)
    }

    #[must_use]
    pub fn with_language(service: AiService, preferred_language: impl Into<String>) -> Self {
        Self {
            service,
            state: Arc::new(Mutex::new(ConversationState {
                generation: 0,
                next_message_id: 0,
                messages: Vec::new(),
                session: None,
                is_loading: false,
                error: None,
                locked_problem_statement: String::new(),
                draft: String::new(),
                preferred_language: preferred_language.into(),
            })),
        }
    }

    /// Starts a new conversation about `problem` and waits for the
    /// structured analysis.
    ///
    /// The transcript is replaced by the problem and a new chat session is
    /// opened. On success the analysis is appended as the first model
    /// message. On failure the transcript keeps only the problem and the
    /// error is recorded; the session stays usable for follow-ups.
    pub async fn start_analysis(&self, problem: &str) -> CoachResult<StructuredAnalysis> {
        let (generation, chat, language) = {
            let mut state = self.state.lock().await;
            if problem.trim().is_empty() {
                return Err(Precondition::EmptyInput.into());
            }
            if state.is_loading {
                return Err(Precondition::Busy.into());
            }

            state.generation += 1;
            state.is_loading = true;
            state.error = None;
            state.locked_problem_statement = problem.to_string();

            let chat = self.service.create_chat();
            state.session = Some(chat.clone());
            state.messages.clear();
            state.push_message(Role::User, MessageContent::Text(problem.to_string()));

            (
                state.generation,
                chat,
                state.preferred_language.clone(),
            )
        };

        let span = info_span!("coach.start_analysis", generation, language = %language);
        let result = self
            .request_analysis(&chat, problem, &language, generation)
            .instrument(span)
            .await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            return Err(CoachError::Superseded);
        }
        state.is_loading = false;
        state.draft.clear();

        match result {
            Ok(analysis) => {
                state.push_message(Role::Model, MessageContent::Analysis(analysis.clone()));
                Ok(analysis)
            }
            Err(error) => {
                tracing::warn!(generation, error = %error, "initial analysis failed");
                state.error = Some(format!(
                    "API Error: {error}. The model may have returned an invalid format."
                ));
                state.messages.truncate(1);
                Err(error)
            }
        }
    }

    async fn request_analysis(
        &self,
        chat: &ChatSession,
        problem: &str,
        language: &str,
        generation: u64,
    ) -> CoachResult<StructuredAnalysis> {
        let mut stream = self.service.stream_analysis(chat, problem, language).await?;
        let mut full_response = String::new();

        while let Some(fragment) = stream.next().await {
            full_response.push_str(&fragment?);
            if !self.is_current(generation).await {
                return Err(CoachError::Superseded);
            }
        }

        parse_analysis(&full_response)
    }

    /// Sends a follow-up on the live session and streams the Markdown answer
    /// into a new model message. Returns the complete answer.
    ///
    /// On failure only the follow-up's own user message is removed. Whatever
    /// the model message received before the failure stays in the
    /// transcript.
    pub async fn send_follow_up(&self, text: &str) -> CoachResult<String> {
        let (generation, chat, language, user_message_id) = {
            let mut state = self.state.lock().await;
            if text.trim().is_empty() {
                return Err(Precondition::EmptyInput.into());
            }
            let Some(chat) = state.session.clone() else {
                return Err(Precondition::NoSession.into());
            };
            if state.is_loading {
                return Err(Precondition::Busy.into());
            }

            state.is_loading = true;
            state.error = None;
            let user_message_id =
                state.push_message(Role::User, MessageContent::Text(text.to_string()));
            state.draft.clear();

            (
                state.generation,
                chat,
                state.preferred_language.clone(),
                user_message_id,
            )
        };

        let span = info_span!("coach.send_follow_up", generation, language = %language);
        let result = self
            .stream_follow_up(&chat, text, &language, generation)
            .instrument(span)
            .await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            return Err(CoachError::Superseded);
        }
        state.is_loading = false;

        if let Err(error) = &result {
            tracing::warn!(generation, error = %error, "follow-up failed");
            state.error = Some(format!("API Error: {error}"));
            state
                .messages
                .retain(|message| message.id != user_message_id);
        }
        result
    }

    async fn stream_follow_up(
        &self,
        chat: &ChatSession,
        text: &str,
        language: &str,
        generation: u64,
    ) -> CoachResult<String> {
        let mut stream = self.service.stream_follow_up(chat, text, language).await?;

        {
            let mut state = self.state.lock().await;
            if state.generation != generation {
                return Err(CoachError::Superseded);
            }
            state.push_message(Role::Model, MessageContent::Text(String::new()));
        }

        let mut full_response = String::new();
        while let Some(fragment) = stream.next().await {
            full_response.push_str(&fragment?);

            let mut state = self.state.lock().await;
            if state.generation != generation {
                return Err(CoachError::Superseded);
            }
            if let Some(last) = state.messages.last_mut() {
                if last.role == Role::Model {
                    last.content = MessageContent::Text(full_response.clone());
                }
            }
        }

        Ok(full_response)
    }

    /// Replaces the code of the analysis at `message_index` with a solution
    /// in `target_language`. Hints and algorithm are never touched.
    ///
    /// Runs independently of the loading flag, but one message can only be
    /// translated once at a time.
    pub async fn translate_code(
        &self,
        message_index: usize,
        target_language: &str,
    ) -> CoachResult<String> {
        let (generation, message_id, chat, problem, algorithm) = {
            let mut state = self.state.lock().await;
            let Some(chat) = state.session.clone() else {
                return Err(Precondition::NoSession.into());
            };
            let generation = state.generation;
            let problem = state.locked_problem_statement.clone();

            let Some(message) = state.messages.get_mut(message_index) else {
                return Err(Precondition::NoSuchMessage(message_index).into());
            };
            let Some(analysis) = message.content.as_analysis() else {
                return Err(Precondition::NotAnAnalysis(message_index).into());
            };
            if message.is_updating {
                return Err(Precondition::AlreadyTranslating(message_index).into());
            }

            let algorithm = analysis.algorithm.clone();
            message.is_updating = true;
            message.updating_to_language = Some(target_language.to_string());
            let message_id = message.id;
            state.error = None;

            (generation, message_id, chat, problem, algorithm)
        };

        let span = info_span!(
            "coach.translate_code",
            generation,
            message_index,
            target_language
        );
        let result = self
            .service
            .code_in_language(&chat, &problem, &algorithm, target_language)
            .instrument(span)
            .await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            return Err(CoachError::Superseded);
        }

        if let Err(error) = &result {
            tracing::warn!(generation, message_index, error = %error, "code translation failed");
            state.error = Some(format!("Failed to get code in {target_language}: {error}"));
        }

        if let Some(message) = state.message_mut(message_id) {
            message.is_updating = false;
            message.updating_to_language = None;
            if let (Ok(code), MessageContent::Analysis(analysis)) = (&result, &mut message.content)
            {
                analysis.code.clone_from(code);
            }
        }

        result
    }

    /// Discards the transcript and session and returns to an empty
    /// conversation. Requests still in flight will not write back.
    pub async fn new_chat(&self) {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.messages.clear();
        state.session = None;
        state.locked_problem_statement.clear();
        state.draft.clear();
        state.error = None;
        state.is_loading = false;
        tracing::debug!(generation = state.generation, "conversation reset");
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        self.state.lock().await.draft = text.into();
    }

    pub async fn draft(&self) -> String {
        self.state.lock().await.draft.clone()
    }

    /// Language used in prompts from now on. Survives [`Self::new_chat`].
    pub async fn set_preferred_language(&self, language: impl Into<String>) {
        self.state.lock().await.preferred_language = language.into();
    }

    pub async fn preferred_language(&self) -> String {
        self.state.lock().await.preferred_language.clone()
    }

    pub async fn dismiss_error(&self) {
        self.state.lock().await.error = None;
    }

    pub async fn is_busy(&self) -> bool {
        self.state.lock().await.is_busy()
    }

    pub async fn snapshot(&self) -> ConversationSnapshot {
        let state = self.state.lock().await;
        ConversationSnapshot {
            phase: state.phase(),
            messages: state.messages.clone(),
            is_loading: state.is_loading,
            error: state.error.clone(),
            locked_problem_statement: state.locked_problem_statement.clone(),
            draft: state.draft.clone(),
            preferred_language: state.preferred_language.clone(),
            has_session: state.session.is_some(),
        }
    }

    async fn is_current(&self, generation: u64) -> bool {
        self.state.lock().await.generation == generation
    }
}
