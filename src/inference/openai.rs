//! `OpenAI`-compatible HTTP provider.
//!
//! Talks to `/v1/models` and `/v1/chat/completions` (or their Azure
//! equivalents) with non-streaming requests.

use serde_json::Value;

use crate::history::ConversationTurn;

use super::provider::AuthStyle;
use super::{ChatReply, InferenceError, InferenceProvider, InferenceSettings};

/// Provider for any `OpenAI`-compatible chat API.
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    http: reqwest::Client,
    settings: InferenceSettings,
}

impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("base_url", &self.settings.base_url)
            .field("provider", &self.settings.provider)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatibleProvider {
    /// Create a provider with its own HTTP client.
    pub fn new(settings: InferenceSettings) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    fn authorize(&self, rb: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.settings.api_key, self.settings.provider.auth_style()) {
            (Some(key), AuthStyle::Bearer) => rb.bearer_auth(key),
            (Some(key), AuthStyle::ApiKeyHeader) => rb.header("api-key", key),
            (None, _) => rb,
        }
    }

    async fn send_json(&self, rb: reqwest::RequestBuilder) -> Result<Value, InferenceError> {
        let resp = self.authorize(rb).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json::<Value>().await?)
    }
}

#[async_trait::async_trait]
impl InferenceProvider for OpenAiCompatibleProvider {
    async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let url = self
            .settings
            .provider
            .build_models_url(&self.settings.base_url);
        tracing::debug!(url = %url, "Listing models");

        let body = self.send_json(self.http.get(&url)).await?;
        parse_model_ids(&body)
    }

    async fn chat(
        &self,
        model: &str,
        messages: &[ConversationTurn],
    ) -> Result<ChatReply, InferenceError> {
        let url = self.settings.provider.build_chat_url(&self.settings.base_url);

        let body = serde_json::json!({
            "model": model,
            "stream": false,
            "messages": messages,
        });

        tracing::debug!(
            url = %url,
            model = %model,
            message_count = messages.len(),
            "Sending chat completion request"
        );

        let resp = self.send_json(self.http.post(&url).json(&body)).await?;
        parse_reply(&resp)
    }
}

/// Extract `data[].id` from a model listing, keeping the reported order.
fn parse_model_ids(body: &Value) -> Result<Vec<String>, InferenceError> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| InferenceError::MalformedResponse("missing `data` array".to_string()))?;

    Ok(data
        .iter()
        .filter_map(|m| m.get("id").and_then(Value::as_str))
        .map(ToString::to_string)
        .collect())
}

/// Extract `choices[0].message.content` from a chat completion.
fn parse_reply(body: &Value) -> Result<ChatReply, InferenceError> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(|reply| ChatReply {
            reply: reply.to_string(),
        })
        .ok_or_else(|| {
            InferenceError::MalformedResponse(
                "missing `choices[0].message.content`".to_string(),
            )
        })
}
