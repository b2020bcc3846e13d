//! Convenience re-exports for common use.

pub use crate::codec::{decode, decode_native, encode, NativeMessage};
pub use crate::config::ParleyConfig;
pub use crate::error::{ParleyError, Result};
pub use crate::provider::{create_provider, Backend, ModelProvider};
pub use crate::stream::{NoopObserver, StreamObserver, ToolCallAccumulator};
pub use crate::tools::{FunctionDefinition, ParameterBuilder, ToolDefinition, ToolParameters};
pub use crate::types::{
    ChatOptions, ChatResponse, ContentPart, FinishReason, ImageDetail, ImageUrl, Message,
    ReasoningEffort, ResponseMeta, Role, ToolCall, Usage,
};
pub use tokio_util::sync::CancellationToken;
