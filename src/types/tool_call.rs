//! Tool-call records.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A single tool invocation emitted by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    index: usize,
    id: String,
    kind: ToolKind,
    function: FunctionCall,
}

impl ToolCall {
    /// A complete function call, as returned by a blocking request.
    pub fn function(
        index: usize,
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            index,
            id: id.into(),
            kind: ToolKind::Function,
            function: FunctionCall::whole(name, arguments),
        }
    }

    /// A function call whose arguments will arrive as fragments.
    pub(crate) fn streaming(index: usize, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
            kind: ToolKind::Function,
            function: FunctionCall::fragments(name),
        }
    }

    /// Position of the call within its assistant turn, as the backend numbered it.
    ///
    /// Blocking responses count calls from zero. Anthropic streams reuse the
    /// content-block index, so there it can skip numbers taken by text blocks.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Backend-assigned identifier. Empty only while a stream is still assigning it.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    pub fn function_call(&self) -> &FunctionCall {
        &self.function
    }

    pub fn name(&self) -> &str {
        self.function.name()
    }

    pub fn arguments(&self) -> &str {
        self.function.arguments()
    }

    /// Parse the arguments as JSON.
    pub fn parse_arguments(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(self.arguments())
    }

    pub(crate) fn push_arguments(&mut self, fragment: &str) {
        self.function.push_fragment(fragment);
    }
}

/// Tool kind. Only function tools exist today.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Function,
}

/// Name and serialized JSON arguments of a function-style call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    name: String,
    arguments: Arguments,
}

/// The two delivery modes never mix within one call.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Arguments {
    Whole(String),
    Fragments(String),
}

impl FunctionCall {
    fn whole(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Arguments::Whole(arguments.into()),
        }
    }

    fn fragments(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Arguments::Fragments(String::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The serialized arguments. For a streamed call this is the concatenation of
    /// the fragments received so far.
    pub fn arguments(&self) -> &str {
        match &self.arguments {
            Arguments::Whole(s) | Arguments::Fragments(s) => s,
        }
    }

    /// Whether the arguments were assembled from streamed fragments.
    pub fn is_streamed(&self) -> bool {
        matches!(self.arguments, Arguments::Fragments(_))
    }

    fn push_fragment(&mut self, fragment: &str) {
        match &mut self.arguments {
            Arguments::Fragments(buf) => buf.push_str(fragment),
            Arguments::Whole(_) => {
                tracing::warn!(name = %self.name, "ignoring argument fragment for a complete call");
            }
        }
    }
}
