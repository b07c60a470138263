use super::api::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
    UsageMetadata,
};
use crate::{
    client_utils, LanguageModel, LanguageModelError, LanguageModelResult, Message, ModelRequest,
    ModelResponse, ResponseChunk, ResponseFormat, ResponseStream, Role, TokenUsage,
};
use async_stream::try_stream;
use futures::StreamExt;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use std::collections::HashMap;

const PROVIDER: &str = "google";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// A Gemini model served by the Generative Language API.
pub struct GoogleModel {
    model_id: String,
    api_key: String,
    base_url: String,
    client: Client,
    headers: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct GoogleModelOptions {
    pub api_key: String,
    /// Defaults to the public `v1beta` endpoint.
    pub base_url: Option<String>,
    /// Extra headers sent with every request.
    pub headers: Option<HashMap<String, String>>,
    pub client: Option<Client>,
}

impl GoogleModel {
    #[must_use]
    pub fn new(model_id: impl Into<String>, options: GoogleModelOptions) -> Self {
        let base_url = options
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Self {
            model_id: model_id.into(),
            api_key: options.api_key,
            base_url,
            client: options.client.unwrap_or_default(),
            headers: options.headers.unwrap_or_default(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/models/{}:{method}", self.base_url, self.model_id)
    }

    /// The key travels in a header so it never appears in a URL.
    fn request_headers(&self) -> LanguageModelResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        for (key, value) in &self.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|error| {
                LanguageModelError::InvalidInput(format!("Invalid header name '{key}': {error}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|error| {
                LanguageModelError::InvalidInput(format!("Invalid header value for '{key}': {error}"))
            })?;
            headers.insert(name, value);
        }

        let mut api_key = HeaderValue::from_str(&self.api_key).map_err(|_| {
            LanguageModelError::InvalidInput("API key is not a valid header value".to_string())
        })?;
        api_key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, api_key);

        Ok(headers)
    }
}

#[async_trait::async_trait]
impl LanguageModel for GoogleModel {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, request: ModelRequest) -> LanguageModelResult<ModelResponse> {
        let body = build_request(request);
        let response: GenerateContentResponse = client_utils::send_json(
            &self.client,
            &self.url("generateContent"),
            &body,
            self.request_headers()?,
        )
        .await?;

        check_prompt_feedback(&response)?;
        let usage = response.usage_metadata.map(token_usage);
        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            LanguageModelError::Invariant(PROVIDER, "No candidate in response".to_string())
        })?;

        Ok(ModelResponse {
            text: answer_text(candidate.content),
            usage,
        })
    }

    async fn stream(&self, request: ModelRequest) -> LanguageModelResult<ResponseStream> {
        let body = build_request(request);
        let mut responses = client_utils::send_sse_stream::<_, GenerateContentResponse>(
            &self.client,
            &self.url("streamGenerateContent?alt=sse"),
            &body,
            self.request_headers()?,
            PROVIDER,
        )
        .await?;

        let chunks = try_stream! {
            while let Some(response) = responses.next().await {
                let response = response?;
                check_prompt_feedback(&response)?;

                let text = answer_text(
                    response.candidates.into_iter().next().and_then(|candidate| candidate.content),
                );
                let usage = response.usage_metadata.map(token_usage);
                if !text.is_empty() || usage.is_some() {
                    yield ResponseChunk { text, usage };
                }
            }
        };

        Ok(chunks.boxed())
    }
}

fn build_request(request: ModelRequest) -> GenerateContentRequest {
    let (response_mime_type, response_json_schema) = match request.response_format {
        None => (None, None),
        Some(ResponseFormat::Text) => (Some("text/plain"), None),
        Some(ResponseFormat::Json(schema)) => (Some("application/json"), Some(schema)),
    };

    GenerateContentRequest {
        contents: request.messages.into_iter().map(to_content).collect(),
        system_instruction: request.system_prompt.map(|prompt| Content {
            role: None,
            parts: vec![text_part(prompt)],
        }),
        generation_config: Some(GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
            response_mime_type,
            response_json_schema,
        }),
    }
}

fn to_content(message: Message) -> Content {
    let role = match message.role {
        Role::User => "user",
        Role::Model => "model",
    };
    Content {
        role: Some(role.to_string()),
        parts: vec![text_part(message.text)],
    }
}

fn text_part(text: String) -> Part {
    Part {
        text: Some(text),
        thought: false,
    }
}

/// Joins the visible text of a candidate, skipping thought parts.
fn answer_text(content: Option<Content>) -> String {
    content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|part| !part.thought)
        .filter_map(|part| part.text)
        .collect()
}

fn check_prompt_feedback(response: &GenerateContentResponse) -> LanguageModelResult<()> {
    let Some(feedback) = &response.prompt_feedback else {
        return Ok(());
    };
    match &feedback.block_reason {
        Some(reason) => Err(LanguageModelError::Refusal(
            feedback
                .block_reason_message
                .clone()
                .unwrap_or_else(|| format!("Prompt blocked: {reason}")),
        )),
        None => Ok(()),
    }
}

fn token_usage(usage: UsageMetadata) -> TokenUsage {
    TokenUsage {
        input_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_gemini_request_body() {
        let request = ModelRequest {
            system_prompt: Some("Be a coach".to_string()),
            messages: vec![Message::user("Two Sum"), Message::model("Use a hash map")],
            response_format: Some(ResponseFormat::Json(
                json!({ "type": "object", "required": ["code"] }),
            )),
            temperature: Some(0.2),
            ..Default::default()
        };

        let body = serde_json::to_value(build_request(request)).expect("serialize request");

        assert_eq!(
            body,
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "Two Sum" }] },
                    { "role": "model", "parts": [{ "text": "Use a hash map" }] },
                ],
                "systemInstruction": { "parts": [{ "text": "Be a coach" }] },
                "generationConfig": {
                    "temperature": 0.2,
                    "responseMimeType": "application/json",
                    "responseJsonSchema": { "type": "object", "required": ["code"] },
                },
            })
        );
    }

    #[test]
    fn thought_parts_are_not_part_of_the_answer() {
        let content: Content = serde_json::from_value(json!({
            "role": "model",
            "parts": [
                { "text": "thinking", "thought": true },
                { "text": "answer" },
            ],
        }))
        .expect("deserialize content");

        assert_eq!(answer_text(Some(content)), "answer");
        assert_eq!(answer_text(None), "");
    }

    #[test]
    fn blocked_prompt_is_a_refusal() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .expect("deserialize response");

        let error = check_prompt_feedback(&response).expect_err("blocked prompt");
        assert!(matches!(error, LanguageModelError::Refusal(message) if message == "Prompt blocked: SAFETY"));
    }

    #[test]
    fn api_key_is_sent_as_a_header_not_in_the_url() {
        let model = GoogleModel::new(
            "gemini-2.5-flash",
            GoogleModelOptions {
                api_key: "SECRET-KEY-123".to_string(),
                base_url: Some("http://localhost:1/v1beta/".to_string()),
                ..Default::default()
            },
        );

        let headers = model.request_headers().expect("headers");
        assert_eq!(headers[API_KEY_HEADER], "SECRET-KEY-123");
        assert!(headers[API_KEY_HEADER].is_sensitive());
        assert_eq!(
            model.url("generateContent"),
            "http://localhost:1/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
