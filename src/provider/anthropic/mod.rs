//! Anthropic Messages API adapter.

pub mod image;
pub mod transport;
pub mod types;

use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ParleyError, Result};
use crate::stream::aggregator::{cancellable, next_frame, StreamAggregator};
use crate::stream::StreamObserver;
use crate::tools::{FunctionDefinition, ToolDefinition};
use crate::types::*;

use super::ModelProvider;

pub use transport::{AnthropicHttpTransport, AnthropicTransport, DEFAULT_BASE_URL};
pub use types::*;

const PROVIDER: &str = "anthropic";

/// `max_tokens` sent when the caller sets none; the API requires the field.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Output tokens kept free for the answer when a thinking budget is clamped.
const THINKING_HEADROOM: u32 = 64;

/// Thinking budget for `effort` under a `max_tokens` ceiling.
///
/// The budget must stay below `max_tokens`: when `budget + 64` would not fit,
/// it shrinks to `max_tokens - 64`, or to `max_tokens - 1` once `max_tokens`
/// is 64 or less. A budget of zero means thinking stays off.
pub fn thinking_budget(effort: ReasoningEffort, max_tokens: u32) -> Option<u32> {
    let mut budget = effort.budget_tokens();
    if budget + THINKING_HEADROOM > max_tokens {
        budget = if max_tokens > THINKING_HEADROOM {
            max_tokens - THINKING_HEADROOM
        } else {
            max_tokens.saturating_sub(1)
        };
    }
    (budget > 0).then_some(budget)
}

/// [`ModelProvider`] speaking the Messages protocol.
pub struct AnthropicProvider {
    model: String,
    transport: Box<dyn AnthropicTransport>,
}

impl AnthropicProvider {
    /// Provider backed by the HTTP transport.
    pub fn new(model: impl Into<String>, api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self::with_transport(model, AnthropicHttpTransport::new(api_key, base_url))
    }

    pub fn with_transport(model: impl Into<String>, transport: impl AnthropicTransport + 'static) -> Self {
        Self {
            model: model.into(),
            transport: Box::new(transport),
        }
    }

    fn build_request(&self, messages: &[Message], options: &ChatOptions, stream: bool) -> MessageRequest {
        let max_tokens = options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        let thinking = options
            .reasoning
            .and_then(|effort| thinking_budget(effort, max_tokens))
            .map(|budget_tokens| ThinkingConfig::Enabled { budget_tokens });

        let mut system_parts: Vec<String> = options
            .system_prompt
            .iter()
            .filter(|p| !p.is_empty())
            .cloned()
            .collect();
        let mut params: Vec<MessageParam> = Vec::with_capacity(messages.len());
        let mut previous_was_tool = false;

        for message in messages {
            match message.role() {
                Role::System => {
                    let text = message.content();
                    if !text.is_empty() {
                        system_parts.push(text);
                    }
                    continue;
                }
                Role::Tool => {
                    let block = tool_result_block(message);
                    let merged = previous_was_tool;
                    previous_was_tool = true;
                    if merged {
                        if let Some(last) = params.last_mut() {
                            last.content.push(block);
                            continue;
                        }
                    }
                    params.push(MessageParam::user(vec![block]));
                    continue;
                }
                Role::User => params.push(MessageParam::user(user_blocks(message))),
                Role::Assistant => {
                    let blocks = assistant_blocks(message);
                    if blocks.is_empty() {
                        debug!("skipping empty assistant message");
                        continue;
                    }
                    params.push(MessageParam::assistant(blocks));
                }
            }
            previous_was_tool = false;
        }

        // The API rejects temperature alongside extended thinking.
        let temperature = match (options.temperature, &thinking) {
            (Some(_), Some(_)) => {
                debug!(model = %self.model, "dropping temperature while thinking is enabled");
                None
            }
            (temperature, _) => temperature,
        };

        MessageRequest {
            model: self.model.clone(),
            messages: params,
            max_tokens,
            system: (!system_parts.is_empty()).then(|| system_parts.join("\n")),
            temperature,
            top_p: options.top_p,
            top_k: options.top_k,
            stop_sequences: options.stop_sequences.clone(),
            thinking,
            tools: options.tools.iter().filter_map(convert_tool).collect(),
            stream,
        }
    }

    fn map_response(&self, response: MessageResponse, started: Instant) -> Result<ChatResponse> {
        if response.content.is_empty() {
            return Err(ParleyError::empty_response(PROVIDER));
        }

        let mut text = String::new();
        let mut reasoning = String::new();
        let mut tool_calls = Vec::new();
        for block in response.content {
            match block {
                ResponseBlock::Text { text: t } => text.push_str(&t),
                ResponseBlock::Thinking { thinking, .. } => reasoning.push_str(&thinking),
                ResponseBlock::ToolUse { id, name, input } => {
                    let arguments = if input.is_null() {
                        "{}".to_string()
                    } else {
                        input.to_string()
                    };
                    tool_calls.push(ToolCall::function(tool_calls.len(), id, name, arguments));
                }
                ResponseBlock::RedactedThinking { .. } | ResponseBlock::Unknown => {}
            }
        }

        let message = Message::assistant(text)
            .with_reasoning(reasoning)
            .with_tool_calls(tool_calls);

        Ok(ChatResponse {
            message,
            usage: map_usage(&response.usage),
            meta: ResponseMeta {
                provider: PROVIDER.to_string(),
                model: if response.model.is_empty() {
                    self.model.clone()
                } else {
                    response.model
                },
                request_id: Some(response.id).filter(|id| !id.is_empty()),
                system_fingerprint: None,
                finish_reason: response.stop_reason.as_deref().and_then(parse_stop_reason),
                stop_reason: response.stop_reason,
            },
            duration: started.elapsed(),
        })
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        cancel: &CancellationToken,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatResponse> {
        let request = self.build_request(messages, options, false);
        debug!(model = %self.model, messages = request.messages.len(), "Anthropic complete");

        let started = Instant::now();
        let response = cancellable(cancel, self.transport.create_message(&request)).await?;
        self.map_response(response, started)
    }

    async fn complete_stream(
        &self,
        cancel: &CancellationToken,
        messages: &[Message],
        options: &ChatOptions,
        observer: &mut dyn StreamObserver,
    ) -> Result<ChatResponse> {
        let request = self.build_request(messages, options, true);
        debug!(model = %self.model, messages = request.messages.len(), "Anthropic complete_stream");

        let mut frames = cancellable(cancel, self.transport.create_message_stream(&request)).await?;
        let mut aggregator = StreamAggregator::new(cancel, observer, PROVIDER, &self.model);
        while let Some(event) = next_frame(cancel, &mut frames).await? {
            apply_event(&mut aggregator, event)?;
        }
        aggregator.finish()
    }
}

fn apply_event(aggregator: &mut StreamAggregator<'_>, event: StreamEvent) -> Result<()> {
    match event {
        StreamEvent::MessageStart { message } => {
            if let Some(role) = message.role.as_deref() {
                aggregator.role(role);
            }
            if !message.id.is_empty() {
                aggregator.meta.request_id = Some(message.id);
            }
            if !message.model.is_empty() {
                aggregator.meta.model = message.model;
            }
            aggregator.usage.merge(&map_usage(&message.usage));
        }
        StreamEvent::ContentBlockStart {
            index,
            content_block,
        } => match content_block {
            ResponseBlock::ToolUse { id, name, .. } => aggregator.declare_tool_call(index, &id, &name)?,
            ResponseBlock::Text { text } => aggregator.content(&text)?,
            ResponseBlock::Thinking { thinking, .. } => aggregator.reasoning(&thinking)?,
            ResponseBlock::RedactedThinking { .. } | ResponseBlock::Unknown => {}
        },
        StreamEvent::ContentBlockDelta { index, delta } => match delta {
            BlockDelta::TextDelta { text } => aggregator.content(&text)?,
            BlockDelta::ThinkingDelta { thinking } => aggregator.reasoning(&thinking)?,
            BlockDelta::InputJsonDelta { partial_json } => {
                aggregator.tool_arguments(index, &partial_json)?
            }
            BlockDelta::SignatureDelta { .. } | BlockDelta::Unknown => {}
        },
        StreamEvent::MessageDelta { delta, usage } => {
            if let Some(reason) = delta.stop_reason {
                aggregator.meta.finish_reason = parse_stop_reason(&reason);
                aggregator.meta.stop_reason = Some(reason);
            }
            if let Some(usage) = usage {
                let totals = &mut aggregator.usage;
                // Counts in message_delta are cumulative.
                totals.output_tokens = usage.output_tokens;
                if usage.input_tokens > 0 {
                    totals.input_tokens = usage.input_tokens;
                }
                totals.total_tokens = totals.input_tokens + totals.output_tokens;
            }
        }
        StreamEvent::Error { error } => {
            return Err(ParleyError::Stream(format!("{}: {}", error.kind, error.message)));
        }
        StreamEvent::ContentBlockStop { .. }
        | StreamEvent::MessageStop
        | StreamEvent::Ping
        | StreamEvent::Unknown => {}
    }
    Ok(())
}

/// Request-side rendering of a single unified message.
///
/// A `tool` message becomes a user message holding one `tool_result` block and
/// a `system` message becomes a user text message, since the Messages API has
/// no such roles inside `messages`.
pub(crate) fn to_message_param(message: &Message) -> MessageParam {
    match message.role() {
        Role::Tool => MessageParam::user(vec![tool_result_block(message)]),
        Role::System => MessageParam::user(vec![ContentBlockParam::text(message.content())]),
        Role::User => MessageParam::user(user_blocks(message)),
        Role::Assistant => MessageParam::assistant(assistant_blocks(message)),
    }
}

fn user_blocks(message: &Message) -> Vec<ContentBlockParam> {
    let blocks: Vec<ContentBlockParam> = message
        .parts()
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => ContentBlockParam::text(text.clone()),
            ContentPart::Image(img) => ContentBlockParam::Image {
                source: image::image_source(&img.url),
            },
        })
        .collect();
    if blocks.is_empty() {
        vec![ContentBlockParam::text("")]
    } else {
        blocks
    }
}

fn assistant_blocks(message: &Message) -> Vec<ContentBlockParam> {
    let text = message.content();
    let mut blocks = Vec::with_capacity(message.tool_calls().len() + 1);
    if !text.is_empty() {
        blocks.push(ContentBlockParam::text(text));
    }
    for call in message.tool_calls() {
        let input = match serde_json::from_str::<serde_json::Value>(call.arguments()) {
            Ok(value) if value.is_object() => value,
            _ => {
                debug!(tool = call.name(), "tool call arguments are not a JSON object, sending {{}}");
                serde_json::json!({})
            }
        };
        blocks.push(ContentBlockParam::ToolUse {
            id: call.id().to_string(),
            name: call.name().to_string(),
            input,
        });
    }
    blocks
}

fn tool_result_block(message: &Message) -> ContentBlockParam {
    ContentBlockParam::ToolResult {
        tool_use_id: message.tool_call_id().unwrap_or_default().to_string(),
        content: message.content(),
        is_error: None,
    }
}

fn convert_tool(definition: &ToolDefinition) -> Option<ToolParam> {
    if let ToolDefinition::Anthropic(tool) = definition {
        if tool.name.trim().is_empty() {
            debug!("skipping Anthropic tool without a name");
            return None;
        }
        return Some(tool.clone());
    }
    definition.to_portable().map(ToolParam::from)
}

impl From<FunctionDefinition> for ToolParam {
    fn from(def: FunctionDefinition) -> Self {
        Self {
            name: def.name,
            description: Some(def.description).filter(|d| !d.is_empty()),
            input_schema: def.parameters,
            strict: def.strict,
        }
    }
}

fn map_usage(usage: &AnthropicUsage) -> Usage {
    Usage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        total_tokens: usage.input_tokens + usage.output_tokens,
        cache_read_tokens: usage.cache_read_input_tokens,
        cache_creation_tokens: usage.cache_creation_input_tokens,
        reasoning_tokens: None,
    }
}

fn parse_stop_reason(s: &str) -> Option<FinishReason> {
    match s {
        "end_turn" | "stop_sequence" => Some(FinishReason::Stop),
        "max_tokens" => Some(FinishReason::Length),
        "tool_use" => Some(FinishReason::ToolCalls),
        "refusal" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}
