//! Chat turn orchestration.
//!
//! A turn records the user's message, sends the conversation so far to the
//! inference provider and records the reply. No store lock is held while the
//! provider call is in flight.

use std::sync::Arc;

use crate::history::{ConversationTurn, HistoryStore, UserId};
use crate::inference::{ChatReply, InferenceError, InferenceProvider};

/// Runs chat turns against a [`HistoryStore`] and an [`InferenceProvider`].
#[derive(Debug, Clone)]
pub struct ChatService {
    history: HistoryStore,
    inference: Arc<dyn InferenceProvider>,
    default_model: String,
}

impl ChatService {
    #[must_use]
    pub fn new(
        history: HistoryStore,
        inference: Arc<dyn InferenceProvider>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            history,
            inference,
            default_model: default_model.into(),
        }
    }

    /// Store backing this service.
    #[must_use]
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    #[must_use]
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Pick the requested model, falling back to the default for `None` or blank names.
    #[must_use]
    pub fn resolve_model<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(self.default_model.as_str())
    }

    /// Run one chat turn and return the assistant's reply.
    ///
    /// The user turn is recorded before the provider is called and stays
    /// recorded if the call fails; the assistant turn is only recorded on
    /// success.
    pub async fn respond(
        &self,
        user_id: &UserId,
        message: impl Into<String>,
        model_name: Option<&str>,
    ) -> Result<ChatReply, InferenceError> {
        let model = self.resolve_model(model_name);

        let context = self
            .history
            .append_and_snapshot(user_id, ConversationTurn::user(message));

        tracing::debug!(
            user_id = %user_id,
            model = %model,
            message_count = context.len(),
            "Sending conversation to inference provider"
        );

        let reply = self.inference.chat(model, &context).await?;

        self.history
            .append(user_id, ConversationTurn::assistant(reply.reply.clone()));

        tracing::debug!(
            user_id = %user_id,
            reply_length = reply.reply.len(),
            "Recorded assistant reply"
        );

        Ok(reply)
    }

    /// List the models the provider offers.
    pub async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        self.inference.list_models().await
    }
}
