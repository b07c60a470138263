use crate::{ModelResponse, ResponseChunk, TokenUsage};

/// Folds the chunks of a streamed reply into the reply `generate` would have
/// returned.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    usage: Option<TokenUsage>,
}

impl StreamAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, chunk: &ResponseChunk) {
        self.text.push_str(&chunk.text);
        if let Some(usage) = chunk.usage {
            *self.usage.get_or_insert_with(TokenUsage::default) += usage;
        }
    }

    /// Text received so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn finish(self) -> ModelResponse {
        ModelResponse {
            text: self.text,
            usage: self.usage,
        }
    }
}
