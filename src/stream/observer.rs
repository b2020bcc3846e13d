//! Callbacks invoked while a response streams in.

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::ToolCall;

/// Receives normalized deltas during a streamed request.
///
/// Callbacks run synchronously on the calling task, in the order the backend
/// emitted the events. Returning an error aborts the stream: the error is
/// handed back to the caller as is and no further callback (including
/// [`on_stop`](Self::on_stop)) runs. Wrap foreign errors with
/// [`ParleyError::observer`](crate::error::ParleyError::observer).
pub trait StreamObserver: Send {
    fn on_content(&mut self, _delta: &str) -> Result<()> {
        Ok(())
    }

    fn on_reasoning(&mut self, _delta: &str) -> Result<()> {
        Ok(())
    }

    fn on_refusal(&mut self, _delta: &str) -> Result<()> {
        Ok(())
    }

    /// A tool call was declared (`fragment` is empty) or received an argument
    /// fragment. `call` already includes `fragment`.
    fn on_tool_call(
        &mut self,
        _cancel: &CancellationToken,
        _call: &ToolCall,
        _fragment: &str,
    ) -> Result<()> {
        Ok(())
    }

    /// The stream ended normally. Runs at most once.
    fn on_stop(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StreamObserver for NoopObserver {}
