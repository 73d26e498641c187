//! Inference provider traits and implementations.
//!
//! The [`InferenceProvider`] trait is the seam between the HTTP layer and the
//! model backend. It lists available models and turns a conversation into a
//! single reply.
//!
//! # Providers
//!
//! - [`OpenAiCompatibleProvider`]: any `OpenAI`-compatible HTTP API
//!   (`/v1/models`, `/v1/chat/completions`), including Azure `OpenAI`
//!
//! # Example
//!
//! ```rust,ignore
//! use chat_assistant::inference::{InferenceSettings, OpenAiCompatibleProvider, Provider};
//!
//! let settings = InferenceSettings {
//!     base_url: "https://api.openai.com".to_string(),
//!     api_key: Some("sk-...".to_string()),
//!     provider: Provider::OpenAI,
//!     request_timeout: std::time::Duration::from_secs(60),
//! };
//! let provider = OpenAiCompatibleProvider::new(settings)?;
//! ```

pub mod openai;
pub mod provider;

pub use openai::OpenAiCompatibleProvider;
pub use provider::Provider;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::InferenceConfig;
use crate::history::ConversationTurn;

/// Connection settings for an inference backend.
#[derive(Debug, Clone)]
pub struct InferenceSettings {
    /// Base URL of the API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Provider type, auto-detected from `base_url` by default.
    pub provider: Provider,
    /// Upper bound for a single provider request.
    pub request_timeout: Duration,
}

impl InferenceSettings {
    /// Build settings from the `inference` config section.
    #[must_use]
    pub fn from_config(config: &InferenceConfig) -> Self {
        let mut provider = Provider::detect_from_url(&config.base_url);

        if let Provider::AzureOpenAI { .. } = &provider
            && let Some(deployment) = &config.deployment_name
        {
            provider = Provider::AzureOpenAI {
                deployment_name: deployment.clone(),
                api_version: config
                    .api_version
                    .clone()
                    .unwrap_or_else(|| provider::DEFAULT_AZURE_API_VERSION.to_string()),
            };
        }

        Self {
            base_url: config.base_url.clone(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            provider,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// A reply produced by an inference provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Assistant text.
    pub reply: String,
}

/// Errors returned by inference providers.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// The request could not be sent or the response body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The response did not have the expected shape.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// Any other provider-specific failure.
    #[error("{0}")]
    Provider(String),
}

/// Trait for inference backends.
///
/// Both calls may fail for any reason (network, quota, unknown model); callers
/// surface every failure the same way.
#[async_trait::async_trait]
pub trait InferenceProvider: Send + Sync + std::fmt::Debug {
    /// List model identifiers in the order the backend reports them.
    async fn list_models(&self) -> Result<Vec<String>, InferenceError>;

    /// Produce a reply for the given conversation.
    async fn chat(
        &self,
        model: &str,
        messages: &[ConversationTurn],
    ) -> Result<ChatReply, InferenceError>;
}
