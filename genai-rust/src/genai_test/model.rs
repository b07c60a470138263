use crate::{
    LanguageModel, LanguageModelError, LanguageModelResult, ModelRequest, ModelResponse,
    ResponseChunk, ResponseStream,
};
use futures::{
    channel::{mpsc, oneshot},
    stream, StreamExt,
};
use std::{collections::VecDeque, sync::Mutex};

const PROVIDER: &str = "mock";

/// What the next `generate` call returns.
pub enum MockGenerateResult {
    Response(ModelResponse),
    Error(LanguageModelError),
    /// Resolves when the test sends on the paired sender. Dropping the
    /// sender fails the call.
    Deferred(oneshot::Receiver<LanguageModelResult<ModelResponse>>),
}

impl MockGenerateResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Response(ModelResponse {
            text: text.into(),
            usage: None,
        })
    }

    pub fn error(error: LanguageModelError) -> Self {
        Self::Error(error)
    }

    pub fn deferred() -> (oneshot::Sender<LanguageModelResult<ModelResponse>>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self::Deferred(receiver))
    }
}

impl From<ModelResponse> for MockGenerateResult {
    fn from(response: ModelResponse) -> Self {
        Self::Response(response)
    }
}

/// What the next `stream` call returns.
pub enum MockStreamResult {
    Chunks(Vec<LanguageModelResult<ResponseChunk>>),
    /// Returned when the stream is opened.
    Error(LanguageModelError),
    /// Items arrive as the test sends them. The stream ends when the sender
    /// is dropped.
    Channel(mpsc::UnboundedReceiver<LanguageModelResult<ResponseChunk>>),
}

impl MockStreamResult {
    /// One text chunk per fragment.
    pub fn text_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Chunks(
            fragments
                .into_iter()
                .map(|fragment| Ok(ResponseChunk::text(fragment)))
                .collect(),
        )
    }

    /// The fragments, then `error` as the last item.
    pub fn text_fragments_then_error<I, S>(fragments: I, error: LanguageModelError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut items: Vec<_> = fragments
            .into_iter()
            .map(|fragment| Ok(ResponseChunk::text(fragment)))
            .collect();
        items.push(Err(error));
        Self::Chunks(items)
    }

    pub fn error(error: LanguageModelError) -> Self {
        Self::Error(error)
    }

    pub fn channel() -> (mpsc::UnboundedSender<LanguageModelResult<ResponseChunk>>, Self) {
        let (sender, receiver) = mpsc::unbounded();
        (sender, Self::Channel(receiver))
    }
}

impl From<Vec<ResponseChunk>> for MockStreamResult {
    fn from(chunks: Vec<ResponseChunk>) -> Self {
        Self::Chunks(chunks.into_iter().map(Ok).collect())
    }
}

#[derive(Default)]
struct Script {
    generate: VecDeque<MockGenerateResult>,
    stream: VecDeque<MockStreamResult>,
    generate_requests: Vec<ModelRequest>,
    stream_requests: Vec<ModelRequest>,
}

/// Answers from queued results, in order, and keeps every request it was
/// given. A call with nothing queued fails with an `Invariant` error.
#[derive(Default)]
pub struct MockLanguageModel {
    script: Mutex<Script>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_generate(&self, result: impl Into<MockGenerateResult>) -> &Self {
        self.script().generate.push_back(result.into());
        self
    }

    pub fn enqueue_stream(&self, result: impl Into<MockStreamResult>) -> &Self {
        self.script().stream.push_back(result.into());
        self
    }

    /// Requests passed to `generate`, oldest first.
    pub fn generate_requests(&self) -> Vec<ModelRequest> {
        self.script().generate_requests.clone()
    }

    /// Requests passed to `stream` that found a queued result.
    pub fn stream_requests(&self) -> Vec<ModelRequest> {
        self.script().stream_requests.clone()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("mock script poisoned")
    }
}

#[async_trait::async_trait]
impl LanguageModel for MockLanguageModel {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, request: ModelRequest) -> LanguageModelResult<ModelResponse> {
        let next = {
            let mut script = self.script();
            script.generate_requests.push(request);
            script.generate.pop_front()
        };
        match next {
            Some(MockGenerateResult::Response(response)) => Ok(response),
            Some(MockGenerateResult::Error(error)) => Err(error),
            Some(MockGenerateResult::Deferred(receiver)) => receiver.await.unwrap_or_else(|_| {
                Err(LanguageModelError::Invariant(
                    PROVIDER,
                    "deferred generate result was dropped".into(),
                ))
            }),
            None => Err(LanguageModelError::Invariant(
                PROVIDER,
                "no mocked generate results available".into(),
            )),
        }
    }

    async fn stream(&self, request: ModelRequest) -> LanguageModelResult<ResponseStream> {
        let next = {
            let mut script = self.script();
            let next = script.stream.pop_front();
            if next.is_some() {
                script.stream_requests.push(request);
            }
            next
        };
        match next {
            Some(MockStreamResult::Chunks(items)) => Ok(stream::iter(items).boxed()),
            Some(MockStreamResult::Error(error)) => Err(error),
            Some(MockStreamResult::Channel(receiver)) => Ok(receiver.boxed()),
            None => Err(LanguageModelError::Invariant(
                PROVIDER,
                "no mocked stream results available".into(),
            )),
        }
    }
}
