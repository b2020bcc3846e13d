//! OpenAI Chat Completions adapter.

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

pub use transport::{OpenAiHttpTransport, OpenAiTransport, DEFAULT_BASE_URL};
pub use types::*;

const PROVIDER: &str = "openai";

/// [`ModelProvider`] speaking the Chat Completions protocol.
pub struct OpenAiProvider {
    model: String,
    transport: Box<dyn OpenAiTransport>,
}

impl OpenAiProvider {
    /// Provider backed by the HTTP transport.
    pub fn new(model: impl Into<String>, api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self::with_transport(model, OpenAiHttpTransport::new(api_key, base_url))
    }

    pub fn with_transport(model: impl Into<String>, transport: impl OpenAiTransport + 'static) -> Self {
        Self {
            model: model.into(),
            transport: Box::new(transport),
        }
    }

    fn build_request(&self, messages: &[Message], options: &ChatOptions, stream: bool) -> ChatCompletionRequest {
        let mut chat_messages = Vec::with_capacity(messages.len() + 1);
        if let Some(prompt) = options.system_prompt.as_deref().filter(|p| !p.is_empty()) {
            chat_messages.push(ChatMessage::text(Role::System, prompt));
        }
        chat_messages.extend(messages.iter().map(to_chat_message));

        if options.top_k.is_some() {
            debug!(model = %self.model, "top_k is not supported by Chat Completions, skipping");
        }

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: chat_messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stop: options.stop_sequences.clone(),
            reasoning_effort: options.reasoning,
            tools: options.tools.iter().filter_map(convert_tool).collect(),
            stream,
            stream_options: stream.then_some(StreamOptions { include_usage: true }),
        }
    }

    fn map_completion(&self, completion: ChatCompletion, started: Instant) -> Result<ChatResponse> {
        let ChatCompletion {
            id,
            model,
            system_fingerprint,
            choices,
            usage,
        } = completion;
        let choice = choices
            .into_iter()
            .next()
            .ok_or_else(|| ParleyError::empty_response(PROVIDER))?;
        let answer = choice.message;

        let tool_calls = answer
            .tool_calls
            .into_iter()
            .enumerate()
            .filter(|(_, call)| !call.function.name.is_empty())
            .map(|(position, call)| {
                ToolCall::function(
                    call.index.unwrap_or(position),
                    call.id,
                    call.function.name,
                    call.function.arguments,
                )
            })
            .collect();

        let role = answer
            .role
            .as_deref()
            .and_then(|r| r.parse::<Role>().ok())
            .filter(|r| *r != Role::Tool)
            .unwrap_or(Role::Assistant);
        let parts = answer
            .content
            .filter(|text| !text.is_empty())
            .map(|text| vec![ContentPart::text(text)])
            .unwrap_or_default();
        let message = Message::from_parts(role, parts)
            .with_reasoning(answer.reasoning_content.unwrap_or_default())
            .with_refusal(answer.refusal.unwrap_or_default())
            .with_tool_calls(tool_calls);

        let mut usage = usage.map(map_usage).unwrap_or_default();
        if usage.total_tokens == 0 {
            usage.total_tokens = usage.input_tokens + usage.output_tokens;
        }

        Ok(ChatResponse {
            message,
            usage,
            meta: ResponseMeta {
                provider: PROVIDER.to_string(),
                model: if model.is_empty() { self.model.clone() } else { model },
                request_id: Some(id).filter(|id| !id.is_empty()),
                system_fingerprint,
                finish_reason: choice.finish_reason.as_deref().and_then(parse_finish_reason),
                stop_reason: choice.finish_reason,
            },
            duration: started.elapsed(),
        })
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
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
        debug!(model = %self.model, messages = request.messages.len(), "OpenAI complete");

        let started = Instant::now();
        let completion = cancellable(cancel, self.transport.create_chat_completion(&request)).await?;
        self.map_completion(completion, started)
    }

    async fn complete_stream(
        &self,
        cancel: &CancellationToken,
        messages: &[Message],
        options: &ChatOptions,
        observer: &mut dyn StreamObserver,
    ) -> Result<ChatResponse> {
        let request = self.build_request(messages, options, true);
        debug!(model = %self.model, messages = request.messages.len(), "OpenAI complete_stream");

        let mut frames =
            cancellable(cancel, self.transport.create_chat_completion_stream(&request)).await?;
        let mut aggregator = StreamAggregator::new(cancel, observer, PROVIDER, &self.model);
        while let Some(chunk) = next_frame(cancel, &mut frames).await? {
            apply_chunk(&mut aggregator, chunk)?;
        }
        aggregator.finish()
    }
}

fn apply_chunk(aggregator: &mut StreamAggregator<'_>, chunk: ChatCompletionChunk) -> Result<()> {
    let meta = &mut aggregator.meta;
    if meta.request_id.is_none() && !chunk.id.is_empty() {
        meta.request_id = Some(chunk.id);
    }
    if !chunk.model.is_empty() {
        meta.model = chunk.model;
    }
    if chunk.system_fingerprint.is_some() {
        meta.system_fingerprint = chunk.system_fingerprint;
    }
    if let Some(usage) = chunk.usage {
        aggregator.usage = map_usage(usage);
    }

    // Usage-only frames carry no choices.
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(());
    };
    let delta = choice.delta;

    if let Some(role) = delta.role.as_deref() {
        aggregator.role(role);
    }
    if let Some(reasoning) = delta.reasoning_content.as_deref() {
        aggregator.reasoning(reasoning)?;
    }
    if let Some(content) = delta.content.as_deref() {
        aggregator.content(content)?;
    }
    if let Some(refusal) = delta.refusal.as_deref() {
        aggregator.refusal(refusal)?;
    }

    for call in delta.tool_calls {
        let function = call.function.unwrap_or_default();
        // A named delta opens a call; its arguments, if any, are the first fragment.
        if let Some(name) = function.name.as_deref().filter(|n| !n.is_empty()) {
            aggregator.declare_tool_call(call.index, call.id.as_deref().unwrap_or_default(), name)?;
        }
        if let Some(arguments) = function.arguments.as_deref() {
            aggregator.tool_arguments(call.index, arguments)?;
        }
    }

    if let Some(reason) = choice.finish_reason {
        aggregator.meta.finish_reason = parse_finish_reason(&reason);
        aggregator.meta.stop_reason = Some(reason);
    }
    Ok(())
}

/// Request-side rendering of a unified message.
pub(crate) fn to_chat_message(message: &Message) -> ChatMessage {
    let text = message.content();
    let content = if message.images().next().is_some() {
        let parts = message
            .parts()
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => ChatContentPart::Text { text: text.clone() },
                ContentPart::Image(image) => ChatContentPart::ImageUrl {
                    image_url: ChatImageUrl {
                        url: image.url.clone(),
                        detail: Some(image.detail),
                    },
                },
            })
            .collect();
        Some(ChatContent::Parts(parts))
    } else if text.is_empty()
        && message.role() == Role::Assistant
        && (!message.tool_calls().is_empty() || message.refusal().is_some())
    {
        None
    } else {
        Some(ChatContent::Text(text))
    };

    let tool_calls = message
        .tool_calls()
        .iter()
        .map(|call| ChatToolCall {
            index: None,
            id: call.id().to_string(),
            kind: call.kind(),
            function: ChatFunctionCall {
                name: call.name().to_string(),
                arguments: call.arguments().to_string(),
            },
        })
        .collect();

    ChatMessage {
        role: message.role(),
        content,
        name: message.name().map(str::to_string),
        refusal: message
            .refusal()
            .filter(|_| message.role() == Role::Assistant)
            .map(str::to_string),
        tool_calls,
        tool_call_id: message.tool_call_id().map(str::to_string),
    }
}

fn convert_tool(definition: &ToolDefinition) -> Option<ChatTool> {
    if let ToolDefinition::OpenAi(tool) = definition {
        if tool.function.name.trim().is_empty() {
            debug!("skipping OpenAI tool without a name");
            return None;
        }
        return Some(tool.clone());
    }
    definition.to_portable().map(ChatTool::from)
}

impl From<FunctionDefinition> for ChatTool {
    fn from(def: FunctionDefinition) -> Self {
        Self {
            kind: ToolKind::Function,
            function: ChatFunction {
                name: def.name,
                description: Some(def.description).filter(|d| !d.is_empty()),
                parameters: Some(def.parameters),
                strict: def.strict,
            },
        }
    }
}

fn map_usage(usage: CompletionUsage) -> Usage {
    Usage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
        cache_read_tokens: usage.prompt_tokens_details.and_then(|d| d.cached_tokens),
        cache_creation_tokens: None,
        reasoning_tokens: usage.completion_tokens_details.and_then(|d| d.reasoning_tokens),
    }
}

fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" | "function_call" => Some(FinishReason::ToolCalls),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}
