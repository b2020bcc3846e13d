//! Backend-agnostic persisted form of a [`Message`].
//!
//! [`encode`] writes a flat JSON object:
//!
//! ```json
//! {"role":"assistant","content":"...","reasoning":"...","tool_calls":[
//!   {"index":0,"id":"call_1","type":"function","name":"lookup","args":"{}"}]}
//! ```
//!
//! Empty fields are omitted. [`decode`] reads it back normalized for whichever
//! backend is active at restore time, and [`decode_native`] goes one step
//! further to that backend's own request message. Images are restored ahead of
//! the text, the same layout [`Message::user_with_images`] produces.

use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};
use crate::provider::Backend;
use crate::types::{ContentPart, ImageDetail, ImageUrl, Message, Role, ToolCall, ToolKind};

#[derive(Debug, Serialize, Deserialize)]
struct PersistedMessage {
    role: Role,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refusal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<PersistedToolCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<PersistedImage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedToolCall {
    index: usize,
    id: String,
    #[serde(rename = "type", default)]
    kind: ToolKind,
    name: String,
    #[serde(default)]
    args: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedImage {
    url: String,
    #[serde(default)]
    detail: String,
}

/// A decoded message in a backend's own request shape.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeMessage {
    #[cfg(feature = "openai")]
    OpenAi(crate::provider::openai::ChatMessage),
    #[cfg(feature = "anthropic")]
    Anthropic(crate::provider::anthropic::MessageParam),
    /// Role and text only, for backends without an adapter.
    Minimal(MinimalMessage),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Serialize a message to its persisted form.
pub fn encode(message: &Message) -> Result<Vec<u8>> {
    let persisted = PersistedMessage {
        role: message.role(),
        content: message.content(),
        reasoning: message.reasoning().map(str::to_string),
        refusal: message.refusal().map(str::to_string),
        name: message.name().map(str::to_string),
        tool_call_id: message.tool_call_id().map(str::to_string),
        tool_calls: message
            .tool_calls()
            .iter()
            .map(|call| PersistedToolCall {
                index: call.index(),
                id: call.id().to_string(),
                kind: call.kind(),
                name: call.name().to_string(),
                args: call.arguments().to_string(),
            })
            .collect(),
        images: message
            .images()
            .map(|image| PersistedImage {
                url: image.url.clone(),
                detail: image.detail.to_string(),
            })
            .collect(),
    };
    Ok(serde_json::to_vec(&persisted)?)
}

/// Restore a message, normalized for `backend`.
///
/// Anthropic has no image detail control and no refusal field, so those are
/// reset. Unknown backends get a role-and-text message.
pub fn decode(bytes: &[u8], backend: &Backend) -> Result<Message> {
    let persisted: PersistedMessage = serde_json::from_slice(bytes)?;

    if persisted.role == Role::Tool && persisted.tool_call_id.as_deref().unwrap_or_default().is_empty() {
        return Err(ParleyError::InvalidArgument(
            "persisted tool message has no tool_call_id".into(),
        ));
    }

    match backend {
        Backend::OpenAi => Ok(restore(persisted, false)),
        Backend::Anthropic => Ok(restore(persisted, true)),
        Backend::Other(name) => {
            tracing::warn!(backend = %name, "unknown backend, restoring role and text only");
            Ok(restore_minimal(persisted))
        }
    }
}

/// Restore a message straight into `backend`'s request shape.
pub fn decode_native(bytes: &[u8], backend: &Backend) -> Result<NativeMessage> {
    let message = decode(bytes, backend)?;
    Ok(match backend {
        #[cfg(feature = "openai")]
        Backend::OpenAi => NativeMessage::OpenAi(crate::provider::openai::to_chat_message(&message)),
        #[cfg(feature = "anthropic")]
        Backend::Anthropic => {
            NativeMessage::Anthropic(crate::provider::anthropic::to_message_param(&message))
        }
        #[allow(unreachable_patterns)]
        _ => NativeMessage::Minimal(MinimalMessage {
            role: message.role(),
            content: message.content(),
            tool_call_id: message.tool_call_id().map(str::to_string),
        }),
    })
}

fn restore(persisted: PersistedMessage, anthropic: bool) -> Message {
    let PersistedMessage {
        role,
        content,
        reasoning,
        refusal,
        name,
        tool_call_id,
        tool_calls,
        images,
    } = persisted;

    let message = if role == Role::Tool {
        Message::tool(tool_call_id.unwrap_or_default(), content)
    } else {
        let mut parts: Vec<ContentPart> = images
            .into_iter()
            .map(|image| {
                let detail = if anthropic {
                    ImageDetail::Auto
                } else {
                    ImageDetail::parse_lossy(&image.detail)
                };
                ContentPart::Image(ImageUrl::with_detail(image.url, detail))
            })
            .collect();
        if !content.is_empty() {
            parts.push(ContentPart::Text { text: content });
        }
        let calls = tool_calls
            .into_iter()
            .map(|call| ToolCall::function(call.index, call.id, call.name, call.args))
            .collect();
        let message = Message::from_parts(role, parts).with_tool_calls(calls);
        if anthropic {
            message
        } else {
            message.with_refusal(refusal.unwrap_or_default())
        }
    };

    message
        .with_reasoning(reasoning.unwrap_or_default())
        .with_name(name.unwrap_or_default())
}

fn restore_minimal(persisted: PersistedMessage) -> Message {
    match persisted.role {
        Role::Tool => Message::tool(persisted.tool_call_id.unwrap_or_default(), persisted.content),
        role => {
            let parts = if persisted.content.is_empty() {
                Vec::new()
            } else {
                vec![ContentPart::text(persisted.content)]
            };
            Message::from_parts(role, parts)
        }
    }
}
