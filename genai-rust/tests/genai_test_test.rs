use coach_genai::{
    genai_test::{MockGenerateResult, MockLanguageModel, MockStreamResult},
    LanguageModel, LanguageModelError, LanguageModelResult, Message, ModelRequest, ModelResponse,
    ResponseChunk, ResponseStream,
};
use futures::StreamExt;

fn user_input(text: &str) -> ModelRequest {
    ModelRequest {
        messages: vec![Message::user(text)],
        ..ModelRequest::default()
    }
}

#[tokio::test]
async fn mock_language_model_tracks_generate_inputs_and_returns_results() {
    let model = MockLanguageModel::new();

    let response1 = ModelResponse {
        text: "Hello, world!".to_string(),
        ..ModelResponse::default()
    };

    model
        .enqueue_generate(response1.clone())
        .enqueue_generate(MockGenerateResult::error(LanguageModelError::InvalidInput(
            "generate error".to_string(),
        )))
        .enqueue_generate(MockGenerateResult::text("Goodbye, world!"));

    let input1 = user_input("Hi");
    let res1 = model
        .generate(input1.clone())
        .await
        .expect("first generate should succeed");
    assert_eq!(res1, response1);

    let err = model
        .generate(user_input("Error"))
        .await
        .expect_err("second generate should error");
    match err {
        LanguageModelError::InvalidInput(msg) => assert_eq!(msg, "generate error"),
        other => panic!("unexpected error variant: {other:?}"),
    }

    let res3 = model
        .generate(user_input("Goodbye"))
        .await
        .expect("third generate should succeed");
    assert_eq!(res3.text, "Goodbye, world!");

    let err = model
        .generate(input1.clone())
        .await
        .expect_err("generate with nothing queued should fail");
    match err {
        LanguageModelError::Invariant(provider, message) => {
            assert_eq!(provider, "mock");
            assert_eq!(message, "no mocked generate results available");
        }
        other => panic!("unexpected error variant: {other:?}"),
    }

    let tracked = model.generate_requests();
    assert_eq!(tracked.len(), 4);
    assert_eq!(tracked[0].messages, input1.messages);
}

#[tokio::test]
async fn mock_language_model_tracks_stream_inputs_and_yields_chunks() {
    let model = MockLanguageModel::new();

    let chunks1 = vec![
        ResponseChunk::text("Hello"),
        ResponseChunk::text(", "),
        ResponseChunk::text("world!"),
    ];

    model
        .enqueue_stream(chunks1.clone())
        .enqueue_stream(MockStreamResult::error(LanguageModelError::InvalidInput(
            "stream error".to_string(),
        )));

    let stream1 = model
        .stream(user_input("Hi"))
        .await
        .expect("first stream should succeed");
    let collected1 = collect_chunks(stream1)
        .await
        .expect("collecting chunks should succeed");
    assert_eq!(collected1, chunks1);

    let Err(err) = model.stream(user_input("Error")).await else {
        panic!("expected stream error");
    };
    match err {
        LanguageModelError::InvalidInput(msg) => assert_eq!(msg, "stream error"),
        other => panic!("unexpected error variant: {other:?}"),
    }
    assert_eq!(model.stream_requests().len(), 2);

    let Err(err) = model.stream(user_input("Nothing left")).await else {
        panic!("expected stream failure");
    };
    match err {
        LanguageModelError::Invariant(provider, message) => {
            assert_eq!(provider, "mock");
            assert_eq!(message, "no mocked stream results available");
        }
        other => panic!("unexpected error variant: {other:?}"),
    }
    assert_eq!(model.stream_requests().len(), 2);
}

#[tokio::test]
async fn mock_language_model_streams_errors_mid_stream() {
    let model = MockLanguageModel::new();
    model.enqueue_stream(MockStreamResult::text_fragments_then_error(
        ["partial"],
        LanguageModelError::Invariant("mock", "connection reset".to_string()),
    ));

    let mut stream = model
        .stream(user_input("Hi"))
        .await
        .expect("stream opens");

    let first = stream.next().await.expect("first item").expect("first ok");
    assert_eq!(first, ResponseChunk::text("partial"));
    let second = stream.next().await.expect("second item");
    assert!(matches!(second, Err(LanguageModelError::Invariant(_, _))));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn mock_language_model_delivers_channel_and_deferred_results() {
    let model = MockLanguageModel::new();
    let (sender, result) = MockStreamResult::channel();
    model.enqueue_stream(result);
    let (reply, deferred) = MockGenerateResult::deferred();
    model.enqueue_generate(deferred);

    let mut stream = model.stream(user_input("Hi")).await.expect("stream opens");
    sender
        .unbounded_send(Ok(ResponseChunk::text("late")))
        .expect("send chunk");
    drop(sender);
    assert_eq!(
        stream.next().await.expect("item").expect("ok"),
        ResponseChunk::text("late")
    );
    assert!(stream.next().await.is_none());

    let pending = model.generate(user_input("Hi"));
    reply
        .send(Ok(ModelResponse {
            text: "resolved".to_string(),
            ..ModelResponse::default()
        }))
        .expect("send reply");
    assert_eq!(pending.await.expect("generate").text, "resolved");
}

async fn collect_chunks(
    mut stream: ResponseStream,
) -> LanguageModelResult<Vec<ResponseChunk>> {
    let mut chunks = Vec::new();
    while let Some(item) = stream.next().await {
        chunks.push(item?);
    }
    Ok(chunks)
}
