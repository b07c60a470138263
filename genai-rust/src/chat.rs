use crate::{
    LanguageModel, LanguageModelResult, Message, ModelRequest, ResponseFormat, StreamAccumulator,
};
use futures::{lock::Mutex, stream::BoxStream, Stream, StreamExt};
use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

/// Per-session model parameters.
#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// A stateful conversation with a language model.
/// Every completed exchange is appended to the session history, so a
/// message sees all earlier turns. A failed or abandoned exchange leaves the
/// history untouched.
/// Cloning is cheap and clones share the same history.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<ChatSessionInner>,
}

struct ChatSessionInner {
    model: Arc<dyn LanguageModel>,
    config: ChatConfig,
    history: Mutex<Vec<Message>>,
}

impl ChatSession {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, config: ChatConfig) -> Self {
        Self {
            inner: Arc::new(ChatSessionInner {
                model,
                config,
                history: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Messages of every completed exchange, oldest first.
    pub async fn history(&self) -> Vec<Message> {
        self.inner.history.lock().await.clone()
    }

    /// Whether two handles refer to the same session.
    #[must_use]
    pub fn same_session(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Send a message and wait for the whole reply.
    pub async fn send_message(
        &self,
        prompt: impl Into<String>,
        response_format: Option<ResponseFormat>,
    ) -> LanguageModelResult<String> {
        let prompt = prompt.into();
        let input = self.inner.input_for(&prompt, response_format).await;
        let text = self.inner.model.generate(input).await?.text;

        self.inner.record_exchange(prompt, text.clone()).await;
        Ok(text)
    }

    /// Send a message and receive the reply as a stream of text fragments.
    /// The exchange is recorded once the stream has been fully consumed.
    pub async fn send_message_stream(
        &self,
        prompt: impl Into<String>,
        response_format: Option<ResponseFormat>,
    ) -> LanguageModelResult<ChatStream> {
        let prompt = prompt.into();
        let input = self.inner.input_for(&prompt, response_format).await;
        let mut model_stream = self.inner.model.stream(input).await?;
        let inner = self.inner.clone();

        let stream = async_stream::try_stream! {
            let mut accumulator = StreamAccumulator::new();

            while let Some(chunk) = model_stream.next().await {
                let chunk = chunk?;
                accumulator.add(&chunk);
                if !chunk.text.is_empty() {
                    yield chunk.text;
                }
            }

            inner.record_exchange(prompt, accumulator.finish().text).await;
        };

        Ok(ChatStream(stream.boxed()))
    }
}

impl ChatSessionInner {
    async fn input_for(
        &self,
        prompt: &str,
        response_format: Option<ResponseFormat>,
    ) -> ModelRequest {
        let mut messages = self.history.lock().await.clone();
        messages.push(Message::user(prompt));

        ModelRequest {
            system_prompt: self.config.system_prompt.clone(),
            messages,
            response_format,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    async fn record_exchange(&self, prompt: String, reply: String) {
        let mut history = self.history.lock().await;
        history.push(Message::user(prompt));
        history.push(Message::model(reply));
    }
}

/// Text fragments of a streamed reply, in receipt order.
pub struct ChatStream(BoxStream<'static, LanguageModelResult<String>>);

impl Stream for ChatStream {
    type Item = LanguageModelResult<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.0.as_mut().poll_next(cx)
    }
}
