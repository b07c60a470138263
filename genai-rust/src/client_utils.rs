use crate::{LanguageModelError, LanguageModelResult};
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::stream::{BoxStream, StreamExt};
use reqwest::{header::HeaderMap, Client, Response};
use serde::{de::DeserializeOwned, Serialize};

pub type JsonChunkStream<R> = BoxStream<'static, LanguageModelResult<R>>;

/// Post `data` as JSON and hand back the response if the status is a
/// success.
async fn post_json<T: Serialize>(
    client: &Client,
    url: &str,
    data: &T,
    headers: HeaderMap,
) -> LanguageModelResult<Response> {
    let response = client.post(url).headers(headers).json(data).send().await?;
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(LanguageModelError::StatusCode(
            status,
            response.text().await.unwrap_or_default(),
        ))
    }
}

/// Create a JSON request, parse the response.
/// Throws error on non OK status code.
pub async fn send_json<T: Serialize, R: DeserializeOwned>(
    client: &Client,
    url: &str,
    data: &T,
    headers: HeaderMap,
) -> LanguageModelResult<R> {
    let response = post_json(client, url, data, headers).await?;
    Ok(response.json::<R>().await?)
}

/// Create a JSON request that returns a typed stream of parsed SSE chunks.
/// Throws error on non OK status code.
pub async fn send_sse_stream<T: Serialize, R: DeserializeOwned + Send + 'static>(
    client: &Client,
    url: &str,
    data: &T,
    headers: HeaderMap,
    provider: &'static str,
) -> LanguageModelResult<JsonChunkStream<R>> {
    let mut sse_stream = post_json(client, url, data, headers)
        .await?
        .bytes_stream()
        .eventsource();

    let stream = async_stream::try_stream! {
        while let Some(event) = sse_stream.next().await {
            let event = map_event_error(event, provider)?;
            if event.data.is_empty() {
                continue;
            }
            if event.data == "[DONE]" {
                break;
            }

            let chunk: R = serde_json::from_str(&event.data).map_err(|e| {
                LanguageModelError::Invariant(provider, format!("Failed to parse stream chunk: {e}"))
            })?;

            yield chunk;
        }
    };

    Ok(Box::pin(stream))
}

fn map_event_error(
    event: Result<Event, EventStreamError<reqwest::Error>>,
    provider: &'static str,
) -> LanguageModelResult<Event> {
    event.map_err(|error| match error {
        EventStreamError::Utf8(_) => LanguageModelError::Invariant(
            provider,
            "Receive invalid UTF-8 sequence for stream data".to_string(),
        ),
        EventStreamError::Parser(error) => LanguageModelError::Invariant(
            provider,
            format!("Receive invalid EventStream data: {error}"),
        ),
        EventStreamError::Transport(error) => error.into(),
    })
}
