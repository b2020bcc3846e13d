//! Configuration: API keys and base URLs per provider.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Global default config (lazy-initialized from env).
static DEFAULT_CONFIG: OnceLock<ParleyConfig> = OnceLock::new();

/// Layered configuration for parley.
///
/// Values set in code override whatever [`from_env`](Self::from_env) loaded.
/// Clones share the same underlying maps.
#[derive(Debug, Clone, Default)]
pub struct ParleyConfig {
    api_keys: Arc<RwLock<HashMap<String, String>>>,
    base_urls: Arc<RwLock<HashMap<String, String>>>,
}

const API_KEY_VARS: [(&str, &str); 2] = [("OPENAI_API_KEY", "openai"), ("ANTHROPIC_API_KEY", "anthropic")];

const BASE_URL_VARS: [(&str, &str); 2] = [
    ("OPENAI_BASE_URL", "openai"),
    ("ANTHROPIC_BASE_URL", "anthropic"),
];

impl ParleyConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables (OPENAI_API_KEY, ANTHROPIC_API_KEY, etc.).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let config = Self::new();
        for (var, provider) in API_KEY_VARS {
            if let Some(key) = lookup(var).filter(|v| !v.trim().is_empty()) {
                config.set_api_key(provider, key);
            }
        }
        for (var, provider) in BASE_URL_VARS {
            if let Some(url) = lookup(var).filter(|v| !v.trim().is_empty()) {
                config.set_base_url(provider, url);
            }
        }
        config
    }

    /// Get (or create) the global default config.
    pub fn global() -> &'static ParleyConfig {
        DEFAULT_CONFIG.get_or_init(Self::from_env)
    }

    pub fn set_api_key(&self, provider: &str, key: impl Into<String>) {
        if let Ok(mut keys) = self.api_keys.write() {
            keys.insert(provider.to_string(), key.into());
        }
    }

    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        self.api_keys.read().ok()?.get(provider).cloned()
    }

    pub fn set_base_url(&self, provider: &str, url: impl Into<String>) {
        if let Ok(mut urls) = self.base_urls.write() {
            urls.insert(provider.to_string(), url.into());
        }
    }

    pub fn get_base_url(&self, provider: &str) -> Option<String> {
        self.base_urls.read().ok()?.get(provider).cloned()
    }

    /// Check if a provider has an API key configured.
    pub fn has_credentials(&self, provider: &str) -> bool {
        self.get_api_key(provider).is_some()
    }
}
