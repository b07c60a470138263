use crate::{
    LanguageModel, LanguageModelError, LanguageModelResult, ModelRequest, ModelResponse,
    ResponseChunk, ResponseStream, TokenUsage,
};
use async_trait::async_trait;
use futures::StreamExt;
use opentelemetry::trace::Status;
use std::time::Instant;
use tracing::{info_span, Span};
use tracing_futures::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Puts every call of the wrapped model in a `coach_genai.generate` or
/// `coach_genai.stream` span with OpenTelemetry GenAI attributes.
pub struct TracedModel<M> {
    inner: M,
}

impl<M: LanguageModel> TracedModel<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<M: LanguageModel> LanguageModel for TracedModel<M> {
    fn provider(&self) -> &'static str {
        self.inner.provider()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn generate(&self, request: ModelRequest) -> LanguageModelResult<ModelResponse> {
        let mut call = CallSpan::open(&self.inner, &request, false);
        let result = self
            .inner
            .generate(request)
            .instrument(call.span.clone())
            .await;

        match &result {
            Ok(response) => call.usage = response.usage,
            Err(error) => call.fail(error),
        }
        result
    }

    async fn stream(&self, request: ModelRequest) -> LanguageModelResult<ResponseStream> {
        let mut call = CallSpan::open(&self.inner, &request, true);
        let span = call.span.clone();
        let mut chunks = match self.inner.stream(request).instrument(span.clone()).await {
            Ok(chunks) => chunks,
            Err(error) => {
                call.fail(&error);
                return Err(error);
            }
        };

        let traced = async_stream::stream! {
            while let Some(item) = chunks.next().await {
                match &item {
                    Ok(chunk) => call.observe(chunk),
                    Err(error) => call.fail(error),
                }
                yield item;
            }
        };
        Ok(traced.instrument(span).boxed())
    }
}

/// Usage and time to first chunk are written when this is dropped, so a
/// stream abandoned by its reader still reports what it received.
struct CallSpan {
    span: Span,
    started: Instant,
    first_chunk_secs: Option<f64>,
    usage: Option<TokenUsage>,
}

impl CallSpan {
    fn open(model: &dyn LanguageModel, request: &ModelRequest, streaming: bool) -> Self {
        let span = if streaming {
            info_span!("coach_genai.stream")
        } else {
            info_span!("coach_genai.generate")
        };
        span.set_attribute("gen_ai.operation.name", "chat");
        span.set_attribute("gen_ai.provider.name", model.provider());
        span.set_attribute("gen_ai.request.model", model.model_id().to_string());
        if let Some(temperature) = request.temperature {
            span.set_attribute("gen_ai.request.temperature", temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            span.set_attribute("gen_ai.request.max_tokens", i64::from(max_tokens));
        }

        Self {
            span,
            started: Instant::now(),
            first_chunk_secs: None,
            usage: None,
        }
    }

    fn observe(&mut self, chunk: &ResponseChunk) {
        if !chunk.text.is_empty() && self.first_chunk_secs.is_none() {
            self.first_chunk_secs = Some(self.started.elapsed().as_secs_f64());
        }
        if let Some(usage) = chunk.usage {
            *self.usage.get_or_insert_with(TokenUsage::default) += usage;
        }
    }

    fn fail(&self, error: &LanguageModelError) {
        tracing::warn!(parent: &self.span, error = %error, "language model call failed");
        self.span.set_status(Status::error(error.to_string()));
    }
}

impl Drop for CallSpan {
    fn drop(&mut self) {
        if let Some(usage) = self.usage {
            self.span
                .set_attribute("gen_ai.usage.input_tokens", i64::from(usage.input_tokens));
            self.span
                .set_attribute("gen_ai.usage.output_tokens", i64::from(usage.output_tokens));
        }
        if let Some(seconds) = self.first_chunk_secs {
            self.span
                .set_attribute("gen_ai.server.time_to_first_token", seconds);
        }
    }
}
