//! Chat Assistant Server
//!
//! Entry point for the chat HTTP service.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;

use chat_assistant::AppState;
use chat_assistant::chat::ChatService;
use chat_assistant::config::AppConfig;
use chat_assistant::history::HistoryStore;
use chat_assistant::inference::{InferenceSettings, OpenAiCompatibleProvider};
use chat_assistant::server::start_server;
use chat_assistant::storage::LocalFileStorage;
use chat_assistant::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before config reads the environment
    let _ = dotenv();

    let config = Arc::new(AppConfig::load().context("failed to load configuration")?);

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init(&config.logging);

    let settings = InferenceSettings::from_config(&config.inference);
    info!(
        name: "inference.config.loaded",
        base_url = %settings.base_url,
        provider = ?settings.provider,
        default_model = %config.inference.default_model,
        "Inference configuration loaded"
    );

    let provider = Arc::new(
        OpenAiCompatibleProvider::new(settings).context("failed to build inference client")?,
    );

    let storage = Arc::new(LocalFileStorage::new(&config.uploads.dir));
    info!(upload_dir = %storage.dir().display(), "Upload storage ready");

    let state = AppState {
        chat: ChatService::new(
            HistoryStore::new(),
            provider,
            config.inference.default_model.clone(),
        ),
        storage,
        config: Arc::clone(&config),
    };

    start_server(config, state).await
}
