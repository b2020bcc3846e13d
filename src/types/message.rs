//! Message types for model communication.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::tool_call::ToolCall;

/// A message in a conversation.
///
/// Fields are private: a message is read through its projections and only
/// built through the factories below, which keeps the role invariants intact
/// (a `tool` message always carries the id of the call it answers).
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    role: Role,
    content: Vec<ContentPart>,
    reasoning: Option<String>,
    refusal: Option<String>,
    tool_call_id: Option<String>,
    tool_calls: Vec<ToolCall>,
    name: Option<String>,
}

impl Message {
    fn bare(role: Role) -> Self {
        Self {
            role,
            content: Vec::new(),
            reasoning: None,
            refusal: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
            name: None,
        }
    }

    /// Crate-internal constructor for non-tool roles (adapters and the codec).
    pub(crate) fn from_parts(role: Role, content: Vec<ContentPart>) -> Self {
        debug_assert!(role != Role::Tool, "tool messages need a tool_call_id");
        Self {
            content,
            ..Self::bare(role)
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::text(text)],
            ..Self::bare(Role::System)
        }
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::text(text)],
            ..Self::bare(Role::User)
        }
    }

    /// Create a user message carrying images.
    ///
    /// Image parts come first, followed by the text part when `text` is non-empty.
    pub fn user_with_images(text: impl Into<String>, images: Vec<ImageUrl>) -> Self {
        let text = text.into();
        let mut content: Vec<ContentPart> = images.into_iter().map(ContentPart::Image).collect();
        if !text.is_empty() || content.is_empty() {
            content.push(ContentPart::Text { text });
        }
        Self {
            content,
            ..Self::bare(Role::User)
        }
    }

    /// Create an assistant message. An empty `text` yields no content parts.
    pub fn assistant(text: impl Into<String>) -> Self {
        let text = text.into();
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![ContentPart::Text { text }]
        };
        Self {
            content,
            ..Self::bare(Role::Assistant)
        }
    }

    /// Create a tool result message answering the call with `tool_call_id`.
    pub fn tool(tool_call_id: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::text(result)],
            tool_call_id: Some(tool_call_id.into()),
            ..Self::bare(Role::Tool)
        }
    }

    /// Create a tool result message answering `call`.
    pub fn tool_result(call: &ToolCall, result: impl Into<String>) -> Self {
        Self::tool(call.id(), result)
    }

    /// Attach tool calls, kept sorted by index.
    pub fn with_tool_calls(mut self, mut tool_calls: Vec<ToolCall>) -> Self {
        tool_calls.sort_by_key(ToolCall::index);
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = non_empty(reasoning.into());
        self
    }

    pub fn with_refusal(mut self, refusal: impl Into<String>) -> Self {
        self.refusal = non_empty(refusal.into());
        self
    }

    /// Set the optional participant name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = non_empty(name.into());
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The concatenation, in order, of every text part. Image parts contribute nothing.
    pub fn content(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// All content parts in order.
    pub fn parts(&self) -> &[ContentPart] {
        &self.content
    }

    /// Image parts in order.
    pub fn images(&self) -> impl Iterator<Item = &ImageUrl> {
        self.content.iter().filter_map(|part| match part {
            ContentPart::Image(image) => Some(image),
            ContentPart::Text { .. } => None,
        })
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    pub fn refusal(&self) -> Option<&str> {
        self.refusal.as_deref()
    }

    /// Id of the originating tool call (tool messages only).
    pub fn tool_call_id(&self) -> Option<&str> {
        self.tool_call_id.as_deref()
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Conversation role.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single part of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    #[serde(rename = "image_url")]
    Image(ImageUrl),
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Image(_) => None,
        }
    }
}

/// An image reference: an http(s) URL, a `data:` URI, or raw base64.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default)]
    pub detail: ImageDetail,
}

impl ImageUrl {
    /// An image with automatic detail selection.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            detail: ImageDetail::Auto,
        }
    }

    pub fn with_detail(url: impl Into<String>, detail: ImageDetail) -> Self {
        Self {
            url: url.into(),
            detail,
        }
    }
}

/// Image fidelity requested from backends that support it.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageDetail {
    Low,
    High,
    #[default]
    Auto,
}

impl ImageDetail {
    /// Parse a detail level, falling back to `Auto` for anything unrecognized.
    pub fn parse_lossy(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}
