//! Provider router: selects the correct adapter based on config.
//!
//! `anthropic` speaks the native messages protocol; every other kind is
//! assumed to expose an OpenAI-compatible chat-completions endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use stepwise_config::ProviderConfig;
use stepwise_core::{Provider, ProviderError};
use tracing::info;

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Named providers plus the one used when no name is given.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Build a router holding the configured provider as its default.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let mut router = Self::new(&config.kind);
        router.register(&config.kind, build_from_config(config)?);
        Ok(router)
    }

    /// Register a provider, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Build the configured provider.
pub fn build_from_config(config: &ProviderConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = match (&config.api_key, requires_key(&config.kind)) {
        (Some(key), _) => key.clone(),
        (None, false) => String::new(),
        (None, true) => {
            return Err(ProviderError::NotConfigured(format!(
                "No API key configured for provider '{}'",
                config.kind
            )));
        }
    };
    let timeout = Duration::from_secs(config.timeout_secs);

    info!(kind = %config.kind, model = %config.model, "Building provider");

    let provider: Arc<dyn Provider> = if config.kind == "anthropic" {
        let mut p = AnthropicProvider::new(api_key)?
            .with_model(&config.model)
            .with_max_tokens(config.max_tokens)
            .with_timeout(timeout)?;
        if let Some(url) = &config.base_url {
            p = p.with_base_url(url);
        }
        Arc::new(p)
    } else {
        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => default_base_url(&config.kind)?,
        };
        Arc::new(
            OpenAiCompatProvider::new(&config.kind, base_url, api_key)?
                .with_model(&config.model)
                .with_max_tokens(config.max_tokens)
                .with_timeout(timeout)?,
        )
    };

    Ok(provider)
}

/// Local servers accept any key.
fn requires_key(kind: &str) -> bool {
    !matches!(kind, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known OpenAI-compatible providers.
fn default_base_url(kind: &str) -> Result<String, ProviderError> {
    let url = match kind {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "ollama" => "http://localhost:11434/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "fireworks" => "https://api.fireworks.ai/inference/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "Unknown provider '{other}': set provider.base_url"
            )));
        }
    };
    Ok(url.into())
}
