use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;

use ollama_link::parser::IncompleteStreamPolicy;
use ollama_link::transport::{MockResponse, MockTransport};
use ollama_link::types::chat::{ChatMessage, ChatRequest};
use ollama_link::types::embed::EmbedRequest;
use ollama_link::types::generate::GenerateRequest;
use ollama_link::types::{
    CopyModelRequest, CreateModelRequest, DeleteModelRequest, HttpRequest, HttpVerb,
    PullModelRequest, Role, ShowModelRequest,
};
use ollama_link::{CancellationToken, DecodeError, Error, OllamaClient, Result};

fn client_with(mock: &MockTransport) -> Result<OllamaClient> {
    OllamaClient::builder()
        .base_url("http://mock.ollama.ai:11434")
        .transport(Arc::new(mock.clone()))
        .build()
}

fn body_json(request: &HttpRequest) -> Value {
    serde_json::from_slice(request.body.as_ref().expect("request has a body")).unwrap()
}

#[tokio::test]
async fn test_generate() -> Result<()> {
    let mock = MockTransport::new().with_response(
        "/api/generate",
        MockResponse::json(
            r#"{"model":"test","response":"test response","done":true,"total_duration":1000}"#,
        ),
    );
    let client = client_with(&mock)?;

    let response = client
        .generate(
            GenerateRequest::new("test", "test prompt"),
            &CancellationToken::new(),
        )
        .await?;

    assert_eq!(response.model, "test");
    assert_eq!(response.response, "test response");
    assert!(response.done);
    assert_eq!(response.total_duration, Duration::from_nanos(1000));

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].verb, HttpVerb::POST);
    assert_eq!(
        requests[0].url.as_str(),
        "http://mock.ollama.ai:11434/api/generate"
    );
    assert_eq!(requests[0].headers[CONTENT_TYPE], "application/json");
    let body = body_json(&requests[0]);
    assert_eq!(body["model"], "test");
    assert_eq!(body["prompt"], "test prompt");
    assert_eq!(body["stream"], false);
    assert!(body.get("options").is_none());

    Ok(())
}

#[tokio::test]
async fn test_generate_stream() -> Result<()> {
    let mock = MockTransport::new().with_response(
        "/api/generate",
        MockResponse::lines([
            r#"{"model":"test","response":"Hel","done":false}"#,
            r#"{"model":"test","response":"lo","done":false}"#,
            r#"{"model":"test","response":"","done":true,"done_reason":"stop","total_duration":5000,"eval_count":2}"#,
        ]),
    );
    let client = client_with(&mock)?;

    let stream = client
        .generate_stream(GenerateRequest::new("test", "hi"), &CancellationToken::new())
        .await?;
    let chunks = stream.collect_all().await?;

    let text: String = chunks.iter().map(|c| c.response.as_str()).collect();
    assert_eq!(text, "Hello");
    assert_eq!(
        chunks.iter().map(|c| c.done).collect::<Vec<_>>(),
        vec![false, false, true]
    );
    let last = chunks.last().unwrap();
    assert_eq!(last.done_reason.as_deref(), Some("stop"));
    assert_eq!(last.total_duration, Duration::from_nanos(5000));
    assert_eq!(last.eval_count, 2);

    assert_eq!(body_json(&mock.requests()[0])["stream"], true);

    Ok(())
}

#[tokio::test]
async fn test_chat() -> Result<()> {
    let mock = MockTransport::new().with_response(
        "/api/chat",
        MockResponse::json(
            r#"{"model":"test","message":{"role":"assistant","content":"Hello from mock!"},"done":true}"#,
        ),
    );
    let client = client_with(&mock)?;

    let request = ChatRequest::new("test").add_message(ChatMessage::user("Hi"));
    let response = client.chat(request, &CancellationToken::new()).await?;

    assert_eq!(response.message.role, Role::Assistant);
    assert_eq!(response.message.content, "Hello from mock!");

    let body = body_json(&mock.requests()[0]);
    assert_eq!(body["stream"], false);
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "Hi");
    assert!(body["messages"][0].get("images").is_none());

    Ok(())
}

#[tokio::test]
async fn test_chat_stream_single_unit() -> Result<()> {
    let mock = MockTransport::new().with_response(
        "/api/chat",
        MockResponse::json(
            r#"{"model":"test","message":{"role":"assistant","content":"hello"},"done":true,"total_duration":1000}"#,
        ),
    );
    let client = client_with(&mock)?;

    let request = ChatRequest::new("test").add_message(ChatMessage::user("Hi"));
    let mut stream = client.chat_stream(request, &CancellationToken::new()).await?;

    let unit = stream.next().await.expect("one unit");
    let response = unit?;
    assert_eq!(response.message.content, "hello");
    assert!(response.done);
    assert!(stream.next().await.is_none());

    Ok(())
}

#[tokio::test]
async fn test_chat_stream_ordering() -> Result<()> {
    let lines: Vec<String> = (0..10)
        .map(|i| {
            format!(
                r#"{{"model":"test","message":{{"role":"assistant","content":"{}"}},"done":{}}}"#,
                i,
                i == 9
            )
        })
        .collect();
    let mock = MockTransport::new().with_response("/api/chat", MockResponse::lines(lines));
    let client = client_with(&mock)?;

    let mut stream = client
        .chat_stream(ChatRequest::new("test"), &CancellationToken::new())
        .await?;

    let mut seen = Vec::new();
    while let Some(unit) = stream.next().await {
        let response = unit?;
        seen.push((response.message.content, response.done));
    }

    assert_eq!(seen.len(), 10);
    for (i, (content, done)) in seen.into_iter().enumerate() {
        assert_eq!(content, i.to_string());
        assert_eq!(done, i == 9);
    }

    Ok(())
}

#[tokio::test]
async fn test_chat_stream_fault_mid_stream() -> Result<()> {
    let mock = MockTransport::new().with_response(
        "/api/chat",
        MockResponse::lines([
            r#"{"model":"test","message":{"role":"assistant","content":"partial"},"done":false}"#,
            r#"{"error":"out of memory"}"#,
            r#"{"model":"test","message":{"role":"assistant","content":"unreachable"},"done":true}"#,
        ]),
    );
    let client = client_with(&mock)?;

    let mut stream = client
        .chat_stream(ChatRequest::new("test"), &CancellationToken::new())
        .await?;

    assert_eq!(stream.next().await.unwrap()?.message.content, "partial");
    let fault = stream.next().await.unwrap().unwrap_err();
    assert!(
        matches!(fault, Error::Decode(DecodeError::Server(ref message)) if message == "out of memory")
    );
    assert!(stream.next().await.is_none());

    Ok(())
}

#[tokio::test]
async fn test_chat_stream_body_failure() -> Result<()> {
    let mock = MockTransport::new().with_response(
        "/api/chat",
        MockResponse::lines([
            r#"{"model":"test","message":{"role":"assistant","content":"a"},"done":false}"#,
        ])
        .then_fail("connection reset by peer"),
    );
    let client = client_with(&mock)?;

    let stream = client
        .chat_stream(ChatRequest::new("test"), &CancellationToken::new())
        .await?;

    let fault = stream.collect_all().await.unwrap_err();
    assert!(matches!(fault, Error::Decode(DecodeError::Body(_))));

    Ok(())
}

#[tokio::test]
async fn test_incomplete_stream_policies() -> Result<()> {
    let line = r#"{"model":"test","message":{"role":"assistant","content":"a"},"done":false}"#;
    let mock = MockTransport::new()
        .with_response("/api/chat", MockResponse::lines([line]))
        .with_response("/api/chat", MockResponse::lines([line]));

    let strict = client_with(&mock)?;
    let mut stream = strict
        .chat_stream(ChatRequest::new("test"), &CancellationToken::new())
        .await?;
    assert_eq!(stream.next().await.unwrap()?.message.content, "a");
    assert!(matches!(
        stream.next().await.unwrap().unwrap_err(),
        Error::Decode(DecodeError::Incomplete)
    ));
    assert!(stream.next().await.is_none());

    let lenient = OllamaClient::builder()
        .base_url("http://mock.ollama.ai:11434")
        .transport(Arc::new(mock.clone()))
        .incomplete_stream_policy(IncompleteStreamPolicy::Ignore)
        .build()?;
    let mut stream = lenient
        .chat_stream(ChatRequest::new("test"), &CancellationToken::new())
        .await?;
    assert_eq!(stream.next().await.unwrap()?.message.content, "a");
    assert!(stream.next().await.is_none());

    Ok(())
}

#[tokio::test]
async fn test_embed() -> Result<()> {
    let mock = MockTransport::new().with_response(
        "/api/embed",
        MockResponse::json(r#"{"model":"test","embeddings":[[1.0,2.0,3.0]],"total_duration":1000}"#),
    );
    let client = client_with(&mock)?;

    let response = client
        .embed(
            EmbedRequest::new("test").add_input("hello"),
            &CancellationToken::new(),
        )
        .await?;

    assert_eq!(response.model, "test");
    assert_eq!(response.embeddings, vec![vec![1.0, 2.0, 3.0]]);
    assert_eq!(response.total_duration, Duration::from_nanos(1000));

    let body = body_json(&mock.requests()[0]);
    assert_eq!(body["input"], serde_json::json!(["hello"]));
    assert!(body.get("stream").is_none());

    Ok(())
}

#[tokio::test]
async fn test_list_models() -> Result<()> {
    let mock = MockTransport::new().with_response(
        "/api/tags",
        MockResponse::json(
            r#"{"models":[{"name":"llama3:latest","modified_at":"2024-05-01T10:00:00Z","size":4661224676}]}"#,
        ),
    );
    let client = client_with(&mock)?;

    let response = client.list_models(&CancellationToken::new()).await?;

    assert_eq!(response.models.len(), 1);
    assert_eq!(response.models[0].name, "llama3:latest");
    assert_eq!(response.models[0].modified_at, "2024-05-01T10:00:00Z");
    assert_eq!(response.models[0].size, 4661224676);

    let requests = mock.requests();
    assert_eq!(requests[0].verb, HttpVerb::GET);
    assert!(requests[0].body.is_none());

    Ok(())
}

#[tokio::test]
async fn test_list_running_models() -> Result<()> {
    let mock = MockTransport::new().with_response(
        "/api/ps",
        MockResponse::json(
            r#"{"models":[{"name":"llama3:latest","model":"llama3:latest","size":5137025024,"size_vram":5137025024,"expires_at":"2024-06-04T14:38:31Z"}]}"#,
        ),
    );
    let client = client_with(&mock)?;

    let response = client.list_running_models(&CancellationToken::new()).await?;

    assert_eq!(response.models.len(), 1);
    assert_eq!(response.models[0].size_vram, 5137025024);

    Ok(())
}

#[tokio::test]
async fn test_show_model() -> Result<()> {
    let mock = MockTransport::new().with_response(
        "/api/show",
        MockResponse::json(
            r#"{"modelfile":"FROM llama3","details":{"format":"gguf","parameter_size":"8.0B","quantization_level":"Q4_0","family":"llama","families":["llama"]}}"#,
        ),
    );
    let client = client_with(&mock)?;

    let response = client
        .show_model(ShowModelRequest::new("llama3"), &CancellationToken::new())
        .await?;

    assert_eq!(response.modelfile, "FROM llama3");
    assert_eq!(response.details.format, "gguf");
    assert_eq!(response.details.parameter_size, "8.0B");
    assert_eq!(response.details.quantization_level, "Q4_0");
    assert_eq!(response.details.family, "llama");
    assert_eq!(response.details.families, vec!["llama".to_string()]);

    let body = body_json(&mock.requests()[0]);
    assert_eq!(body, serde_json::json!({"model": "llama3"}));

    Ok(())
}

#[tokio::test]
async fn test_delete_and_copy_model() -> Result<()> {
    let mock = MockTransport::new()
        .with_response("/api/delete", MockResponse::status(StatusCode::OK))
        .with_response("/api/copy", MockResponse::status(StatusCode::OK));
    let client = client_with(&mock)?;
    let cancel = CancellationToken::new();

    client
        .delete_model(DeleteModelRequest::new("old"), &cancel)
        .await?;
    client
        .copy_model(CopyModelRequest::new("llama3", "llama3-backup"), &cancel)
        .await?;

    let requests = mock.requests();
    assert_eq!(requests[0].verb, HttpVerb::DELETE);
    assert_eq!(requests[0].headers[CONTENT_TYPE], "application/json");
    assert_eq!(body_json(&requests[0]), serde_json::json!({"model": "old"}));
    assert_eq!(requests[1].verb, HttpVerb::POST);
    assert_eq!(
        body_json(&requests[1]),
        serde_json::json!({"source": "llama3", "destination": "llama3-backup"})
    );

    Ok(())
}

#[tokio::test]
async fn test_error_body_with_success_status_is_a_server_fault() -> Result<()> {
    let mock = MockTransport::new()
        .with_response("/api/generate", MockResponse::json(r#"{"error":"model crashed"}"#))
        .with_response("/api/embed", MockResponse::json(r#"{"error":"input too long"}"#))
        .with_response("/api/delete", MockResponse::json(r#"{"error":"model is busy"}"#));
    let client = client_with(&mock)?;
    let cancel = CancellationToken::new();

    let err = client
        .generate(GenerateRequest::new("test", "hi"), &cancel)
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Decode(DecodeError::Server(ref message)) if message == "model crashed")
    );

    let err = client
        .embed(EmbedRequest::new("test").add_input("a"), &cancel)
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Decode(DecodeError::Server(ref message)) if message == "input too long")
    );

    let err = client
        .delete_model(DeleteModelRequest::new("test"), &cancel)
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Decode(DecodeError::Server(ref message)) if message == "model is busy")
    );

    Ok(())
}

#[tokio::test]
async fn test_version() -> Result<()> {
    let mock =
        MockTransport::new().with_response("/api/version", MockResponse::json(r#"{"version":"0.5.1"}"#));
    let client = client_with(&mock)?;

    assert_eq!(client.version(&CancellationToken::new()).await?, "0.5.1");

    Ok(())
}

#[tokio::test]
async fn test_pull_model_progress() -> Result<()> {
    let mock = MockTransport::new().with_response(
        "/api/pull",
        MockResponse::lines([
            r#"{"status":"pulling manifest"}"#,
            r#"{"status":"downloading","digest":"sha256:abc","total":100,"completed":50}"#,
            r#"{"status":"downloading","digest":"sha256:abc","total":100,"completed":100}"#,
            r#"{"status":"success"}"#,
            r#"{"status":"never read"}"#,
        ]),
    );
    let client = client_with(&mock)?;

    let progress = client
        .pull_model(PullModelRequest::new("llama3"), &CancellationToken::new())
        .await?
        .collect_all()
        .await?;

    let statuses: Vec<&str> = progress.iter().map(|p| p.status.as_str()).collect();
    assert_eq!(
        statuses,
        vec!["pulling manifest", "downloading", "downloading", "success"]
    );
    assert_eq!(progress[1].completed, 50);
    assert_eq!(body_json(&mock.requests()[0])["stream"], true);

    Ok(())
}

#[tokio::test]
async fn test_create_model_request_shape() -> Result<()> {
    let mock = MockTransport::new().with_response(
        "/api/create",
        MockResponse::lines([r#"{"status":"success"}"#]),
    );
    let client = client_with(&mock)?;

    let request = CreateModelRequest::new("mario")
        .from_model("llama3")
        .system("You are Mario.");
    let progress = client
        .create_model(request, &CancellationToken::new())
        .await?
        .collect_all()
        .await?;

    assert_eq!(progress.len(), 1);
    assert_eq!(
        body_json(&mock.requests()[0]),
        serde_json::json!({"model": "mario", "from": "llama3", "system": "You are Mario.", "stream": true})
    );

    Ok(())
}

fn assert_status<T>(result: Result<T>, expected: StatusCode) {
    match result.err() {
        Some(Error::Status { status, .. }) => assert_eq!(status, expected),
        Some(other) => panic!("expected a status error, got {other}"),
        None => panic!("expected a status error, got success"),
    }
}

#[tokio::test]
async fn test_every_operation_reports_server_errors() -> Result<()> {
    let paths = [
        "/api/generate",
        "/api/chat",
        "/api/embed",
        "/api/tags",
        "/api/ps",
        "/api/show",
        "/api/delete",
        "/api/copy",
        "/api/pull",
        "/api/push",
        "/api/create",
        "/api/version",
    ];
    let mut mock = MockTransport::new();
    for path in paths {
        // generate and chat are called twice: once one-shot, once streaming
        for _ in 0..2 {
            mock = mock.with_response(
                path,
                MockResponse::status(StatusCode::INTERNAL_SERVER_ERROR),
            );
        }
    }
    let client = client_with(&mock)?;
    let cancel = CancellationToken::new();
    let expected = StatusCode::INTERNAL_SERVER_ERROR;

    assert_status(client.generate(GenerateRequest::new("m", "p"), &cancel).await, expected);
    assert_status(
        client.generate_stream(GenerateRequest::new("m", "p"), &cancel).await,
        expected,
    );
    assert_status(client.chat(ChatRequest::new("m"), &cancel).await, expected);
    assert_status(client.chat_stream(ChatRequest::new("m"), &cancel).await, expected);
    assert_status(client.embed(EmbedRequest::new("m"), &cancel).await, expected);
    assert_status(client.list_models(&cancel).await, expected);
    assert_status(client.list_running_models(&cancel).await, expected);
    assert_status(client.show_model(ShowModelRequest::new("m"), &cancel).await, expected);
    assert_status(client.delete_model(DeleteModelRequest::new("m"), &cancel).await, expected);
    assert_status(
        client.copy_model(CopyModelRequest::new("a", "b"), &cancel).await,
        expected,
    );
    assert_status(client.pull_model(PullModelRequest::new("m"), &cancel).await, expected);
    assert_status(client.push_model(PullModelRequest::new("m"), &cancel).await, expected);
    assert_status(
        client.create_model(CreateModelRequest::new("m"), &cancel).await,
        expected,
    );
    assert_status(client.version(&cancel).await, expected);

    Ok(())
}

#[tokio::test]
async fn test_status_error_carries_status_text_and_releases_body() -> Result<()> {
    let released = Arc::new(AtomicUsize::new(0));
    let mock = MockTransport::new().with_response(
        "/api/chat",
        MockResponse::json(r#"{"error":"model 'nope' not found"}"#)
            .with_status(StatusCode::INTERNAL_SERVER_ERROR)
            .on_release(released.clone()),
    );
    let client = client_with(&mock)?;

    let err = client
        .chat_stream(ChatRequest::new("nope"), &CancellationToken::new())
        .await
        .err()
        .expect("status error");

    let text = err.to_string();
    assert!(text.contains("500 Internal Server Error"), "{text}");
    assert!(text.contains("model 'nope' not found"), "{text}");
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(released.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_unscripted_path_is_not_found() -> Result<()> {
    let client = client_with(&MockTransport::new())?;

    let err = client
        .version(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Status { status, message: Some(_) } if status == StatusCode::NOT_FOUND
    ));

    Ok(())
}

#[tokio::test]
async fn test_transport_failure_produces_no_stream() -> Result<()> {
    let mock = MockTransport::new()
        .with_response("/api/chat", MockResponse::transport_error("connection refused"))
        .with_response("/api/generate", MockResponse::transport_error("connection refused"));
    let client = client_with(&mock)?;
    let cancel = CancellationToken::new();

    let err = client
        .chat_stream(ChatRequest::new("m"), &cancel)
        .await
        .err()
        .expect("transport error");
    assert!(matches!(err, Error::Transport(_)));

    let err = client
        .generate(GenerateRequest::new("m", "p"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));

    Ok(())
}

#[tokio::test]
async fn test_malformed_one_shot_body_is_a_decode_error() -> Result<()> {
    let mock = MockTransport::new().with_response("/api/embed", MockResponse::json("{not json"));
    let client = client_with(&mock)?;

    let err = client
        .embed(EmbedRequest::new("m"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode(DecodeError::Json(_))));

    Ok(())
}

#[tokio::test]
async fn test_base_url_prefix_is_kept() -> Result<()> {
    let mock =
        MockTransport::new().with_response("/ollama/api/version", MockResponse::json(r#"{"version":"1"}"#));
    let client = OllamaClient::builder()
        .base_url("http://gateway.local/ollama/")
        .transport(Arc::new(mock.clone()))
        .build()?;

    client.version(&CancellationToken::new()).await?;
    assert_eq!(
        mock.requests()[0].url.as_str(),
        "http://gateway.local/ollama/api/version"
    );

    Ok(())
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let err = OllamaClient::builder()
        .base_url("not a url")
        .transport(Arc::new(MockTransport::new()))
        .build()
        .err()
        .expect("invalid url");
    assert!(matches!(err, Error::Client(_)));

    let err = OllamaClient::builder()
        .base_url("mailto:someone@example.com")
        .transport(Arc::new(MockTransport::new()))
        .build()
        .err()
        .expect("cannot-be-a-base url");
    assert!(matches!(err, Error::Client(_)));
}

#[tokio::test]
async fn test_client_is_shared_between_tasks() -> Result<()> {
    let mut mock = MockTransport::new();
    for _ in 0..8 {
        mock = mock.with_response("/api/version", MockResponse::json(r#"{"version":"0.5.1"}"#));
    }
    let client = client_with(&mock)?;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.version(&CancellationToken::new()).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap()?, "0.5.1");
    }
    assert_eq!(mock.requests().len(), 8);

    Ok(())
}
