//! Chat-reply service binding.
//!
//! [`HttpChatService`] posts `{session_id, message, language_code}` as JSON
//! and expects `{"response": "..."}` back.  All connection details come from
//! [`ChatConfig`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;
use crate::services::{check_status, http_client, ServiceError, API_KEY_HEADER};

/// One user turn sent to the chat backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    pub language_code: String,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    response: String,
}

/// Produces the bot's reply to a user message.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn ChatService>`.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn reply(&self, request: &ChatRequest) -> Result<String, ServiceError>;
}

/// JSON-over-HTTP chat backend.
pub struct HttpChatService {
    client: reqwest::Client,
    config: ChatConfig,
}

impl HttpChatService {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            config: config.clone(),
        }
    }

    fn parse_reply(body: &str) -> Result<String, ServiceError> {
        let reply: ChatReply =
            serde_json::from_str(body).map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let text = reply.response.trim();
        if text.is_empty() {
            return Err(ServiceError::Malformed("empty chat reply".into()));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl ChatService for HttpChatService {
    async fn reply(&self, request: &ChatRequest) -> Result<String, ServiceError> {
        let mut req = self.client.post(&self.config.url).json(request);
        if let Some(key) = self.config.api_key() {
            req = req.header(API_KEY_HEADER, key);
        }

        let response = check_status(req.send().await?).await?;
        let body = response.text().await?;
        Self::parse_reply(&body)
    }
}
