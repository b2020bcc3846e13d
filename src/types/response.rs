//! Results returned by a completed request.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::options::FinishReason;
use super::tool_call::ToolCall;
use super::usage::Usage;

/// Request metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseMeta {
    /// Backend provider (e.g. `openai`, `anthropic`).
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// OpenAI server fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
    /// Stop reason exactly as the backend reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// The outcome of one blocking or streamed request.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Final assistant message.
    pub message: Message,
    pub usage: Usage,
    pub meta: ResponseMeta,
    /// Wall time from dispatch to completion.
    pub duration: Duration,
}

impl ChatResponse {
    /// Tool calls in index order.
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.message.tool_calls()
    }

    /// Flattened answer text.
    pub fn text(&self) -> String {
        self.message.content()
    }
}
