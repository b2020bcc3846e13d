//! Per-request options and related enums.

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::tools::ToolDefinition;

/// Options for a single chat request.
///
/// Built once per call and passed by reference; nothing here is global. Every
/// field defaults to "unset", in which case the backend's own default applies
/// (Anthropic additionally needs `max_tokens`, which falls back to 4096).
///
/// ```
/// use parley::types::{ChatOptions, ReasoningEffort};
///
/// let options = ChatOptions::builder()
///     .system_prompt("You are terse.")
///     .max_tokens(2048)
///     .reasoning(ReasoningEffort::Low)
///     .build();
/// assert_eq!(options.max_tokens, Some(2048));
/// ```
#[derive(Debug, Clone, Default, Builder)]
pub struct ChatOptions {
    /// System prompt placed ahead of the conversation.
    #[builder(into)]
    pub system_prompt: Option<String>,
    /// Tools the model may call.
    #[builder(default)]
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    /// Nucleus sampling.
    pub top_p: Option<f64>,
    /// Top-k sampling (Anthropic only).
    pub top_k: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
    /// Reasoning effort: passed through to OpenAI, mapped to a thinking budget for Anthropic.
    pub reasoning: Option<ReasoningEffort>,
}

/// Reasoning effort level for reasoning models.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    /// Thinking budget used by backends that express reasoning as a token budget.
    pub fn budget_tokens(self) -> u32 {
        match self {
            Self::Low => 1024,
            Self::Medium => 4096,
            Self::High => 8192,
        }
    }
}

/// Why generation finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}
