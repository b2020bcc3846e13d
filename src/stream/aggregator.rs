//! Frame-loop state shared by the streaming adapters.

use std::time::Instant;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::{ParleyError, Result};
use crate::types::{ChatResponse, ContentPart, Message, ResponseMeta, Role, Usage};

use super::accumulator::ToolCallAccumulator;
use super::observer::StreamObserver;
use super::FrameStream;

/// Wait for the next frame unless the caller cancels first.
///
/// Cancellation wins when both are ready. `Ok(None)` means the stream ended.
pub(crate) async fn next_frame<T>(
    cancel: &CancellationToken,
    frames: &mut FrameStream<T>,
) -> Result<Option<T>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ParleyError::Cancelled),
        frame = frames.next() => frame.transpose(),
    }
}

/// Race a one-shot request against cancellation.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    request: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ParleyError::Cancelled),
        result = request => result,
    }
}

/// Collects normalized deltas from either backend, forwarding each one to the
/// observer before buffering it.
pub(crate) struct StreamAggregator<'a> {
    cancel: &'a CancellationToken,
    observer: &'a mut dyn StreamObserver,
    started: Instant,
    role: Option<Role>,
    content: String,
    reasoning: String,
    refusal: String,
    tool_calls: ToolCallAccumulator,
    pub usage: Usage,
    pub meta: ResponseMeta,
}

impl<'a> StreamAggregator<'a> {
    pub fn new(
        cancel: &'a CancellationToken,
        observer: &'a mut dyn StreamObserver,
        provider: &str,
        model: &str,
    ) -> Self {
        Self {
            cancel,
            observer,
            started: Instant::now(),
            role: None,
            content: String::new(),
            reasoning: String::new(),
            refusal: String::new(),
            tool_calls: ToolCallAccumulator::new(),
            usage: Usage::default(),
            meta: ResponseMeta {
                provider: provider.to_string(),
                model: model.to_string(),
                ..Default::default()
            },
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ParleyError::Cancelled);
        }
        Ok(())
    }

    /// Record the role the first time the backend names one.
    pub fn role(&mut self, role: &str) {
        if self.role.is_some() || role.is_empty() {
            return;
        }
        match role.parse::<Role>() {
            Ok(role) => self.role = Some(role),
            Err(_) => tracing::debug!(role, "ignoring unknown stream role"),
        }
    }

    pub fn content(&mut self, delta: &str) -> Result<()> {
        if delta.is_empty() {
            return Ok(());
        }
        self.ensure_live()?;
        self.observer.on_content(delta)?;
        self.content.push_str(delta);
        Ok(())
    }

    pub fn reasoning(&mut self, delta: &str) -> Result<()> {
        if delta.is_empty() {
            return Ok(());
        }
        self.ensure_live()?;
        self.observer.on_reasoning(delta)?;
        self.reasoning.push_str(delta);
        Ok(())
    }

    pub fn refusal(&mut self, delta: &str) -> Result<()> {
        if delta.is_empty() {
            return Ok(());
        }
        self.ensure_live()?;
        self.observer.on_refusal(delta)?;
        self.refusal.push_str(delta);
        Ok(())
    }

    pub fn declare_tool_call(&mut self, index: usize, id: &str, name: &str) -> Result<()> {
        self.ensure_live()?;
        let call = self.tool_calls.declare(index, id, name);
        self.observer.on_tool_call(self.cancel, call, "")
    }

    pub fn is_tool_call_declared(&self, index: usize) -> bool {
        self.tool_calls.get(index).is_some()
    }

    pub fn tool_arguments(&mut self, index: usize, fragment: &str) -> Result<()> {
        if fragment.is_empty() {
            return Ok(());
        }
        self.ensure_live()?;
        match self.tool_calls.append_arguments(index, fragment) {
            Some(call) => self.observer.on_tool_call(self.cancel, call, fragment),
            None => Ok(()),
        }
    }

    /// End of stream: notify the observer once and assemble the response.
    pub fn finish(mut self) -> Result<ChatResponse> {
        self.ensure_live()?;
        self.observer.on_stop()?;

        let role = match self.role {
            Some(Role::Tool) | None => Role::Assistant,
            Some(role) => role,
        };
        let parts = if self.content.is_empty() {
            Vec::new()
        } else {
            vec![ContentPart::text(self.content)]
        };
        let message = Message::from_parts(role, parts)
            .with_reasoning(self.reasoning)
            .with_refusal(self.refusal)
            .with_tool_calls(self.tool_calls.finalize());

        let mut usage = self.usage;
        if usage.total_tokens == 0 {
            usage.total_tokens = usage.input_tokens + usage.output_tokens;
        }

        Ok(ChatResponse {
            message,
            usage,
            meta: self.meta,
            duration: self.started.elapsed(),
        })
    }
}
