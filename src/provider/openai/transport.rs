//! Transport seam for the Chat Completions API.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::provider::http::{bearer_headers, post_json, read_json, sse_json_stream};
use crate::stream::FrameStream;

use super::types::{ChatCompletion, ChatCompletionChunk, ChatCompletionRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Sends Chat Completions requests. The adapter only ever talks to this trait.
#[async_trait]
pub trait OpenAiTransport: Send + Sync {
    async fn create_chat_completion(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion>;

    async fn create_chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<FrameStream<ChatCompletionChunk>>;
}

/// `reqwest` implementation of [`OpenAiTransport`].
#[derive(Debug, Clone)]
pub struct OpenAiHttpTransport {
    api_key: String,
    base_url: String,
}

impl OpenAiHttpTransport {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl OpenAiTransport for OpenAiHttpTransport {
    async fn create_chat_completion(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion> {
        debug!(model = %request.model, "OpenAI chat completion");
        let resp = post_json(&self.url(), bearer_headers(&self.api_key), request).await?;
        read_json(resp).await
    }

    async fn create_chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<FrameStream<ChatCompletionChunk>> {
        debug!(model = %request.model, "OpenAI chat completion stream");
        let resp = post_json(&self.url(), bearer_headers(&self.api_key), request).await?;
        Ok(sse_json_stream(resp))
    }
}
