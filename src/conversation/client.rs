use crate::models::api::{ ChatRequest, ChatResponse };
use crate::models::chat::MessageContent;
use crate::render::is_error_text;
use async_trait::async_trait;
use log::debug;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request cancelled")]
    Cancelled,
    #[error("could not reach the chat proxy: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("chat proxy returned an unreadable reply (status {0})")]
    InvalidReply(u16),
    #[error("invalid proxy url '{0}'")]
    InvalidUrl(String),
}

/// Outbound half of the conversation. Implementations must stop work and
/// return `ClientError::Cancelled` once `cancel` fires.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn send(
        &self,
        request: &ChatRequest,
        cancel: CancellationToken
    ) -> Result<MessageContent, ClientError>;
}

/// Maps a proxy reply body onto message content. `response` carries the
/// answer (or the 502 fallback text); `error` carries upstream failures.
/// Text arriving with a failure status always renders as an error, whatever
/// the configured fallback wording.
pub fn interpret_reply(status: u16, body: JsonValue) -> MessageContent {
    if let Ok(ChatResponse { response }) = serde_json::from_value::<ChatResponse>(body.clone()) {
        let success = (200..300).contains(&status);
        return match MessageContent::from(response) {
            MessageContent::Text(text) if !success && !is_error_text(&text) => {
                MessageContent::Text(format!("Error: {}", text))
            }
            content => content,
        };
    }
    if let Some(error) = body.get("error").and_then(JsonValue::as_str) {
        return MessageContent::Text(format!("Error: {}", error));
    }
    MessageContent::Text(format!("Error: unexpected reply (status {})", status))
}

#[derive(Clone, Debug)]
pub struct HttpAgentClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpAgentClient {
    pub fn new(endpoint: &str) -> Result<Self, ClientError> {
        let endpoint = Url::parse(endpoint).map_err(|_| ClientError::InvalidUrl(endpoint.to_string()))?;
        Ok(Self { http: reqwest::Client::new(), endpoint })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn post(&self, request: &ChatRequest) -> Result<MessageContent, ClientError> {
        let response = self.http.post(self.endpoint.clone()).json(request).send().await?;
        let status = response.status().as_u16();
        debug!("Proxy answered with status {}", status);
        let bytes = response.bytes().await?;
        let body: JsonValue = serde_json
            ::from_slice(&bytes)
            .map_err(|_| ClientError::InvalidReply(status))?;
        Ok(interpret_reply(status, body))
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn send(
        &self,
        request: &ChatRequest,
        cancel: CancellationToken
    ) -> Result<MessageContent, ClientError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.post(request) => result,
        }
    }
}
