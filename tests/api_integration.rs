//! End-to-end tests for the HTTP surface.
//!
//! The router is driven in-process with `axum-test`; inference is replaced by
//! a scripted provider and uploads go to a temporary directory.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use chat_assistant::AppState;
use chat_assistant::chat::ChatService;
use chat_assistant::config::{
    AppConfig, InferenceConfig, LoggingConfig, ResilienceConfig, ServerConfig, UploadConfig,
};
use chat_assistant::history::{ConversationTurn, HistoryStore, Role};
use chat_assistant::inference::{ChatReply, InferenceError, InferenceProvider};
use chat_assistant::server::{ChatResponse, HistoryResponse, UploadResponse, build_router};
use chat_assistant::storage::LocalFileStorage;
use serde_json::{Value, json};
use std::future::IntoFuture;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

/// Inference provider that replies with a fixed text and records each call.
#[derive(Debug)]
struct MockProvider {
    reply: Result<String, String>,
    calls: Mutex<Vec<(String, Vec<ConversationTurn>)>>,
}

impl MockProvider {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl InferenceProvider for MockProvider {
    async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        match &self.reply {
            Ok(_) => Ok(vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()]),
            Err(message) => Err(InferenceError::Provider(message.clone())),
        }
    }

    async fn chat(
        &self,
        model: &str,
        messages: &[ConversationTurn],
    ) -> Result<ChatReply, InferenceError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));
        match &self.reply {
            Ok(reply) => Ok(ChatReply {
                reply: reply.clone(),
            }),
            Err(message) => Err(InferenceError::Provider(message.clone())),
        }
    }
}

struct Harness {
    server: TestServer,
    history: HistoryStore,
    provider: Arc<MockProvider>,
    uploads: TempDir,
}

/// Fixed configuration, independent of the process environment and any
/// `config.*` file in the working directory.
fn test_config(uploads: &TempDir) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        inference: InferenceConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: None,
            default_model: "default-model".to_string(),
            deployment_name: None,
            api_version: None,
            request_timeout_secs: 5,
        },
        uploads: UploadConfig {
            dir: uploads.path().join("uploads").display().to_string(),
            max_body_bytes: 1024 * 1024,
        },
        resilience: ResilienceConfig {
            timeout_disabled: false,
            request_timeout_secs: 30,
        },
        logging: LoggingConfig { json: false },
    }
}

fn setup(provider: MockProvider) -> Harness {
    let uploads = tempfile::tempdir().expect("tempdir");
    let config = Arc::new(test_config(&uploads));
    let provider = Arc::new(provider);
    let history = HistoryStore::new();

    let state = AppState {
        chat: ChatService::new(
            history.clone(),
            Arc::clone(&provider) as Arc<dyn InferenceProvider>,
            config.inference.default_model.clone(),
        ),
        storage: Arc::new(LocalFileStorage::new(&config.uploads.dir)),
        config,
    };

    Harness {
        server: TestServer::new(build_router(state)).expect("test server"),
        history,
        provider,
        uploads,
    }
}

// =============================================================================
// Chat
// =============================================================================

#[tokio::test]
async fn test_chat_records_turns_and_echoes_user_id() {
    let h = setup(MockProvider::replying("hi"));

    let response = h
        .server
        .post("/chat")
        .json(&json!({"user_id": "alice", "message": "hello there"}))
        .await;

    response.assert_status_ok();
    let body: ChatResponse = response.json();
    assert_eq!(body.reply, "hi");
    assert_eq!(body.conversation_id, "alice");

    assert_eq!(
        h.history.read("alice"),
        vec![
            ConversationTurn::user("hello there"),
            ConversationTurn::assistant("hi"),
        ]
    );

    let calls = h.provider.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "default-model");
}

#[tokio::test]
async fn test_chat_uses_requested_model() {
    let h = setup(MockProvider::replying("ok"));

    h.server
        .post("/chat")
        .json(&json!({"user_id": "bob", "message": "hey", "model_name": "gpt-4o"}))
        .await
        .assert_status_ok();

    assert_eq!(h.provider.calls.lock().unwrap()[0].0, "gpt-4o");
}

#[tokio::test]
async fn test_chat_inference_failure_is_internal_error() {
    let h = setup(MockProvider::failing("quota exceeded"));

    let response = h
        .server
        .post("/chat")
        .json(&json!({"user_id": "alice", "message": "hello"}))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(
        body["detail"]
            .as_str()
            .is_some_and(|d| d.contains("quota exceeded"))
    );

    // No assistant turn is recorded for a failed call.
    let turns = h.history.read("alice");
    assert!(turns.iter().all(|t| t.role() == Role::User));
}

#[tokio::test]
async fn test_chat_rejects_malformed_bodies() {
    let h = setup(MockProvider::replying("hi"));

    h.server
        .post("/chat")
        .json(&json!({"user_id": "", "message": "hello"}))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    h.server
        .post("/chat")
        .json(&json!({"user_id": "alice"}))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    assert!(h.history.is_empty());
    assert!(h.provider.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_unparseable_body_is_unprocessable() {
    let h = setup(MockProvider::replying("hi"));

    let response = h
        .server
        .post("/chat")
        .text("{not json")
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(body["detail"].is_string());
    assert!(h.history.is_empty());
}

#[tokio::test]
async fn test_chat_without_json_content_type_is_unprocessable() {
    let h = setup(MockProvider::replying("hi"));

    let response = h
        .server
        .post("/chat")
        .text(r#"{"user_id": "alice", "message": "hello"}"#)
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(body["detail"].is_string());
    assert!(h.provider.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_chats_same_user_lose_nothing() {
    let h = setup(MockProvider::replying("ack"));

    let requests = (0..10).map(|i| {
        h.server
            .post("/chat")
            .json(&json!({"user_id": "carol", "message": format!("m{i}")}))
            .into_future()
    });
    for response in futures::future::join_all(requests).await {
        response.assert_status_ok();
    }

    let turns = h.history.read("carol");
    assert_eq!(turns.len(), 20);
    for i in 0..10 {
        let content = format!("m{i}");
        assert_eq!(turns.iter().filter(|t| t.content() == content).count(), 1);
    }
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_history_unknown_user_is_empty() {
    let h = setup(MockProvider::replying("hi"));

    let response = h.server.get("/history/nobody").await;
    response.assert_status_ok();
    response.assert_json(&json!({"conversation": []}));
}

#[tokio::test]
async fn test_history_returns_conversation_in_order() {
    let h = setup(MockProvider::replying("hi"));

    for message in ["one", "two"] {
        h.server
            .post("/chat")
            .json(&json!({"user_id": "alice", "message": message}))
            .await
            .assert_status_ok();
    }

    let response = h.server.get("/history/alice").await;
    response.assert_json(&json!({
        "conversation": [
            {"role": "user", "content": "one"},
            {"role": "assistant", "content": "hi"},
            {"role": "user", "content": "two"},
            {"role": "assistant", "content": "hi"}
        ]
    }));

    let other: HistoryResponse = h.server.get("/history/bob").await.json();
    assert!(other.conversation.is_empty());
}

// =============================================================================
// Models
// =============================================================================

#[tokio::test]
async fn test_models_lists_provider_models() {
    let h = setup(MockProvider::replying("hi"));

    let response = h.server.get("/models").await;
    response.assert_status_ok();
    response.assert_json(&json!(["gpt-4o", "gpt-4o-mini"]));
}

#[tokio::test]
async fn test_models_failure_is_internal_error() {
    let h = setup(MockProvider::failing("connection refused"));

    h.server
        .get("/models")
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_upload_writes_bytes_unchanged() {
    let h = setup(MockProvider::replying("hi"));

    let form = MultipartForm::new()
        .add_text("session_id", "alice")
        .add_part(
            "file",
            Part::bytes(b"abc".to_vec())
                .file_name("x.png")
                .mime_type("image/png"),
        );

    let response = h.server.post("/upload").multipart(form).await;
    response.assert_status_ok();

    let body: UploadResponse = response.json();
    assert_eq!(body.filename, "x.png");
    assert_eq!(body.status, "uploaded");
    assert_eq!(body.size, 3);

    let stored = std::fs::read(h.uploads.path().join("uploads").join("x.png")).unwrap();
    assert_eq!(stored, b"abc");

    // Uploads never touch the history store.
    assert!(h.history.is_empty());
}

#[tokio::test]
async fn test_upload_without_file_part_is_rejected() {
    let h = setup(MockProvider::replying("hi"));

    let form = MultipartForm::new().add_text("session_id", "alice");

    h.server
        .post("/upload")
        .multipart(form)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_upload_storage_failure_is_internal_error() {
    let h = setup(MockProvider::replying("hi"));

    // A regular file where the upload directory should be makes directory
    // creation fail.
    std::fs::write(h.uploads.path().join("uploads"), b"not a directory").unwrap();

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"abc".to_vec())
            .file_name("x.txt")
            .mime_type("text/plain"),
    );

    let response = h.server.post("/upload").multipart(form).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(
        body["detail"]
            .as_str()
            .is_some_and(|d| d.starts_with("upload failed:"))
    );
}
