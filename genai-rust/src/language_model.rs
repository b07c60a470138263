use crate::{LanguageModelResult, ModelRequest, ModelResponse, ResponseChunk};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Chunks of a reply in arrival order. An `Err` item ends the reply.
pub type ResponseStream = BoxStream<'static, LanguageModelResult<ResponseChunk>>;

/// A hosted model that answers a [`ModelRequest`] in one piece or as a
/// stream.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short vendor name used in traces and errors.
    fn provider(&self) -> &'static str;

    fn model_id(&self) -> &str;

    async fn generate(&self, request: ModelRequest) -> LanguageModelResult<ModelResponse>;

    /// Resolves once the reply has started. Failures before that point are
    /// returned here rather than through the stream.
    async fn stream(&self, request: ModelRequest) -> LanguageModelResult<ResponseStream>;
}
