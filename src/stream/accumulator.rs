//! Assembles streamed tool calls from index-addressed fragments.

use std::collections::BTreeMap;

use crate::types::ToolCall;

/// Per-stream registry of in-flight tool calls, keyed by index.
///
/// A call is declared once (id and name), then receives argument fragments
/// which are concatenated in arrival order. [`finalize`](Self::finalize)
/// hands the calls back sorted by index no matter how the events interleaved.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<usize, ToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a call at `index`. A later declaration at the same index replaces
    /// the earlier partial call.
    pub fn declare(&mut self, index: usize, id: impl Into<String>, name: impl Into<String>) -> &ToolCall {
        let call = ToolCall::streaming(index, id, name);
        if let Some(stale) = self.calls.get(&index) {
            if stale.id() != call.id() {
                tracing::debug!(index, stale = stale.id(), id = call.id(), "tool call index redeclared");
            }
        }
        self.calls.insert(index, call);
        &self.calls[&index]
    }

    /// Append an argument fragment to the call at `index`.
    ///
    /// Returns `None`, dropping the fragment, when nothing was declared there.
    pub fn append_arguments(&mut self, index: usize, fragment: &str) -> Option<&ToolCall> {
        match self.calls.get_mut(&index) {
            Some(call) => {
                call.push_arguments(fragment);
                Some(&*call)
            }
            None => {
                tracing::trace!(index, "dropping argument fragment for undeclared tool call");
                None
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&ToolCall> {
        self.calls.get(&index)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Consume the accumulator, yielding calls in ascending index order.
    pub fn finalize(self) -> Vec<ToolCall> {
        self.calls.into_values().collect()
    }
}
