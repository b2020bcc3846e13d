//! Transport seam for the Messages API.

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use crate::error::Result;
use crate::provider::http::{anthropic_headers, post_json, read_json, sse_json_stream};
use crate::stream::FrameStream;

use super::types::{MessageRequest, MessageResponse, StreamEvent};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Sends Messages API requests. The adapter only ever talks to this trait.
#[async_trait]
pub trait AnthropicTransport: Send + Sync {
    async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse>;

    async fn create_message_stream(&self, request: &MessageRequest) -> Result<FrameStream<StreamEvent>>;
}

/// `reqwest` implementation of [`AnthropicTransport`].
#[derive(Debug, Clone)]
pub struct AnthropicHttpTransport {
    api_key: String,
    base_url: String,
}

impl AnthropicHttpTransport {
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
        format!("{}/messages", self.base_url)
    }
}

#[async_trait]
impl AnthropicTransport for AnthropicHttpTransport {
    async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse> {
        debug!(model = %request.model, "Anthropic create_message");
        let headers = anthropic_headers(&self.api_key, API_VERSION);
        let resp = post_json(&self.url(), headers, request).await?;
        read_json(resp).await
    }

    async fn create_message_stream(&self, request: &MessageRequest) -> Result<FrameStream<StreamEvent>> {
        debug!(model = %request.model, "Anthropic create_message_stream");
        let headers = anthropic_headers(&self.api_key, API_VERSION);
        let resp = post_json(&self.url(), headers, request).await?;

        // The stream is over once message_stop arrives, even if the socket stays open.
        let events = sse_json_stream::<StreamEvent>(resp);
        let stream = async_stream::stream! {
            futures::pin_mut!(events);
            while let Some(event) = events.next().await {
                let stop = matches!(event, Ok(StreamEvent::MessageStop));
                yield event;
                if stop {
                    break;
                }
            }
        };
        Ok(Box::pin(stream))
    }
}
