//! Chat Assistant
//!
//! A small HTTP service in front of an `OpenAI`-compatible inference API. It
//! lists models, runs chat turns with per-user history kept in memory, and
//! stores uploaded files in a local directory.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server (`/models`, `/chat`, `/upload`, `/history/{user_id}`)
//! - **History**: in-process conversation store with per-user locking
//! - **Inference**: provider trait plus an `OpenAI`-compatible HTTP client
//! - **Storage**: write-only sink for uploads
//!
//! # Modules
//!
//! - [`chat`]: One chat turn, end to end
//! - [`config`]: Layered configuration (defaults, file, env, CLI)
//! - [`history`]: Conversation turns and the history store
//! - [`inference`]: Inference provider trait and implementations
//! - [`storage`]: Upload storage
//! - [`server`]: Router and handlers

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod chat;
pub mod config;
pub mod error;
pub mod history;
pub mod inference;
pub mod server;
pub mod storage;
pub mod telemetry;

use crate::chat::ChatService;
use crate::config::AppConfig;
use crate::storage::FileStorage;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Chat turns, model listing and the history store behind them.
    pub chat: ChatService,
    /// Sink for uploaded files.
    pub storage: Arc<dyn FileStorage>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
