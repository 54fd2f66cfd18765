//! LLM provider client.
//!
//! The stream coordinator only depends on the [`ChatClient`] trait; the
//! concrete [`HttpChatClient`] speaks the OpenAI-compatible
//! `/chat/completions` SSE protocol (which also covers Cerebras and most
//! proxy endpoints via the configurable base URL).

pub mod client;
pub mod streaming;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::stream::Stream;
use serde::Serialize;
use thiserror::Error;

pub use client::HttpChatClient;

#[derive(Error, Debug)]
pub enum LlmError {
    /// Connection failed, timeout, mid-stream transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response, rate limit, invalid request
    #[error("API error: {0}")]
    Api(String),

    /// Invalid JSON, unexpected response format
    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// One message in a chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Model selection and sampling parameters for one request.
#[derive(Debug, Clone)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A lazy, forward-only sequence of assistant text deltas. Terminates when
/// the model finishes; an `Err` item means the stream died mid-response.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Streaming chat completion client.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn open_stream(
        &self,
        messages: Vec<ChatMessage>,
        params: &ModelParams,
    ) -> Result<TokenStream>;
}
