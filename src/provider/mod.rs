//! Model provider trait and backend adapters.

pub mod http;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "anthropic")]
pub mod anthropic;

use async_trait::async_trait;
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;

use crate::config::ParleyConfig;
use crate::error::{ParleyError, Result};
use crate::stream::StreamObserver;
use crate::types::{ChatOptions, ChatResponse, Message};

/// Backend selector, used to pick an adapter and to re-specialize persisted messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Backend {
    OpenAi,
    Anthropic,
    /// Any backend this crate has no adapter for.
    #[strum(default)]
    Other(String),
}

impl Backend {
    /// Lowercase backend name as used for config keys.
    pub fn as_str(&self) -> &str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Other(name) => name,
        }
    }
}

/// One conversational interface over every backend.
///
/// Each call performs exactly one request/response cycle. Tool calls in the
/// response are returned to the caller, never executed.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "openai", "anthropic").
    fn provider_name(&self) -> &str;
    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    /// Issue one blocking request.
    async fn complete(
        &self,
        cancel: &CancellationToken,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatResponse>;

    /// Issue one streamed request, forwarding deltas to `observer` as they arrive.
    async fn complete_stream(
        &self,
        cancel: &CancellationToken,
        messages: &[Message],
        options: &ChatOptions,
        observer: &mut dyn StreamObserver,
    ) -> Result<ChatResponse>;
}

/// Create a provider for `backend` serving `model`, using the provided config.
#[allow(unused_variables)]
pub fn create_provider(
    backend: &Backend,
    model: impl Into<String>,
    config: &ParleyConfig,
) -> Result<Box<dyn ModelProvider>> {
    let model = model.into();
    if model.trim().is_empty() {
        return Err(ParleyError::Configuration("model id must not be empty".into()));
    }

    match backend {
        #[cfg(feature = "openai")]
        Backend::OpenAi => {
            let api_key = config
                .get_api_key("openai")
                .ok_or_else(|| ParleyError::Authentication("Missing OPENAI_API_KEY".into()))?;
            Ok(Box::new(openai::OpenAiProvider::new(
                model,
                api_key,
                config.get_base_url("openai"),
            )))
        }
        #[cfg(feature = "anthropic")]
        Backend::Anthropic => {
            let api_key = config
                .get_api_key("anthropic")
                .ok_or_else(|| ParleyError::Authentication("Missing ANTHROPIC_API_KEY".into()))?;
            Ok(Box::new(anthropic::AnthropicProvider::new(
                model,
                api_key,
                config.get_base_url("anthropic"),
            )))
        }
        other => Err(ParleyError::Configuration(format!(
            "no provider for backend '{}' (not built in or not enabled via feature flags)",
            other.as_str()
        ))),
    }
}
