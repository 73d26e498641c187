//! HTTP surface: router assembly, middleware and the four handlers.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Request, State, rejection::JsonRejection},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use tower_http::trace::TraceLayer;

use tracing::{debug, info};

use crate::AppState;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::history::{ConversationTurn, UserId};

/// Start the Axum server with the provided configuration and state.
pub async fn start_server(config: Arc<AppConfig>, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // A disabled timeout is a one-year timeout, so the layer stack keeps one type.
    let timeout_duration = if state.config.resilience.timeout_disabled {
        Duration::from_secs(365 * 24 * 60 * 60)
    } else {
        Duration::from_secs(state.config.resilience.request_timeout_secs)
    };
    let body_limit = state.config.uploads.max_body_bytes;

    Router::new()
        .route("/models", get(list_models))
        .route("/chat", post(chat))
        .route("/upload", post(upload))
        .route("/history/{user_id}", get(history))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /models - List model identifiers from the inference provider.
async fn list_models(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let models = state.chat.list_models().await?;
    debug!(model_count = models.len(), "Listed models");
    Ok(Json(models))
}

/// Request body for chat API.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation key.
    pub user_id: UserId,
    /// User message content.
    pub message: String,
    /// Model to use instead of the configured default.
    #[serde(default)]
    pub model_name: Option<String>,
}

/// Response from chat API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Assistant reply.
    pub reply: String,
    /// Echo of the request's `user_id`.
    pub conversation_id: String,
}

/// POST /chat - Run one chat turn.
///
/// Every body rejection (bad syntax, wrong content type, missing fields) is a
/// 422 with a `detail` message.
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = payload?;
    info!(
        user_id = %req.user_id,
        model_name = ?req.model_name,
        message_length = req.message.len(),
        "Received chat request"
    );

    let reply = state
        .chat
        .respond(&req.user_id, req.message, req.model_name.as_deref())
        .await?;

    Ok(Json(ChatResponse {
        reply: reply.reply,
        conversation_id: req.user_id.into(),
    }))
}

/// Response for a stored upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Name the file was stored under.
    pub filename: String,
    /// Always `"uploaded"`.
    pub status: String,
    /// Size in bytes.
    pub size: usize,
}

/// POST /upload - Store the first file part of a multipart body.
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut session_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(e.to_string()))?
    {
        let Some(filename) = field.file_name().map(ToString::to_string) else {
            // Plain form fields; the session is only used for logging.
            if field.name() == Some("session_id") {
                session_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Multipart(e.to_string()))?,
                );
            }
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Multipart(e.to_string()))?;

        let stored = state.storage.store(&filename, &data).await?;

        info!(
            filename = %stored.filename,
            size = stored.size,
            session_id = ?session_id,
            "Stored uploaded file"
        );

        return Ok(Json(UploadResponse {
            filename: stored.filename,
            status: "uploaded".to_string(),
            size: stored.size,
        }));
    }

    Err(AppError::Unprocessable(
        "multipart body has no file part".to_string(),
    ))
}

/// Response for the history endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub conversation: Vec<ConversationTurn>,
}

/// GET /history/{user_id} - Conversation so far; empty for unknown users.
async fn history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<HistoryResponse> {
    let conversation = state.chat.history().read(&user_id);
    debug!(
        user_id = %user_id,
        message_count = conversation.len(),
        "Read conversation history"
    );
    Json(HistoryResponse { conversation })
}
