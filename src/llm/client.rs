//! OpenAI-compatible streaming HTTP client.

use async_trait::async_trait;
use reqwest::header;
use serde_json::json;

use super::streaming::SseTokenStream;
use super::{ChatClient, ChatMessage, LlmError, ModelParams, Result, TokenStream};

/// Client for any provider speaking the OpenAI `/chat/completions` protocol.
#[derive(Clone)]
pub struct HttpChatClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl HttpChatClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn open_stream(
        &self,
        messages: Vec<ChatMessage>,
        params: &ModelParams,
    ) -> Result<TokenStream> {
        let body = json!({
            "model": params.model,
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "stream": true,
        });

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                log::warn!("streaming request failed: {}", e);
                LlmError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::warn!("provider returned {}: {}", status, error_text);
            return Err(LlmError::Api(format!(
                "provider error {}: {}",
                status, error_text
            )));
        }

        Ok(Box::pin(SseTokenStream::new(response.bytes_stream())))
    }
}
